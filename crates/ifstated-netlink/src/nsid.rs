//! Namespace-id lookup/allocation (spec §4.1, §6 "Netlink collaborator").
//!
//! `rtnetlink::Handle` has no dedicated nsid family, so this issues the
//! `RTM_GETNSID`/`RTM_NEWNSID` request directly over a short-lived netlink
//! socket, the same request/response shape `Handle`'s own family wrappers
//! use internally.

use netlink_packet_core::{NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_REQUEST};
use netlink_packet_route::nsid::{NsidAttribute, NsidMessage};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};

use crate::error::NetlinkError;

/// Sentinel meaning "no nsid assigned yet" (spec §4.1, §6).
pub const NSID_UNASSIGNED: i32 = -1;

fn open_socket() -> Result<Socket, NetlinkError> {
    let mut socket = Socket::new(NETLINK_ROUTE).map_err(NetlinkError::Io)?;
    socket.bind_auto().map_err(NetlinkError::Io)?;
    socket.connect(&SocketAddr::new(0, 0)).map_err(NetlinkError::Io)?;
    Ok(socket)
}

fn request(payload: RouteNetlinkMessage) -> NetlinkMessage<RouteNetlinkMessage> {
    let mut msg = NetlinkMessage::new(
        NetlinkHeader::default(),
        NetlinkPayload::from(payload),
    );
    msg.header.flags = NLM_F_REQUEST | NLM_F_ACK;
    msg.finalize();
    msg
}

fn send_and_recv(socket: &Socket, msg: NetlinkMessage<RouteNetlinkMessage>) -> Result<Vec<u8>, NetlinkError> {
    let mut buf = vec![0u8; msg.buffer_len()];
    msg.serialize(&mut buf);
    socket.send(&buf, 0).map_err(NetlinkError::Io)?;
    let mut recv_buf = vec![0u8; 4096];
    let n = socket.recv(&mut recv_buf, 0).map_err(NetlinkError::Io)?;
    recv_buf.truncate(n);
    Ok(recv_buf)
}

/// Query the local nsid assigned to the namespace whose fd is `ns_fd`.
/// Returns `NSID_UNASSIGNED` if none has been assigned yet (spec §4.1).
pub fn get_netnsid(ns_fd: i32) -> Result<i32, NetlinkError> {
    let socket = open_socket()?;
    let mut nsid_msg = NsidMessage::default();
    nsid_msg.attributes.push(NsidAttribute::Fd(ns_fd));
    let msg = request(RouteNetlinkMessage::GetNsId(nsid_msg));
    let raw = send_and_recv(&socket, msg)?;
    parse_nsid_response(&raw)
}

/// Allocate a new nsid for the namespace whose fd is `ns_fd` (spec §4.1:
/// "call set_netnsid(pid=..., nsid=auto) and re-read").
pub fn set_netnsid(ns_fd: i32) -> Result<i32, NetlinkError> {
    let socket = open_socket()?;
    let mut nsid_msg = NsidMessage::default();
    nsid_msg.attributes.push(NsidAttribute::Fd(ns_fd));
    nsid_msg.attributes.push(NsidAttribute::Id(NSID_UNASSIGNED));
    let msg = request(RouteNetlinkMessage::NewNsId(nsid_msg));
    let _ = send_and_recv(&socket, msg)?;
    get_netnsid(ns_fd)
}

fn parse_nsid_response(raw: &[u8]) -> Result<i32, NetlinkError> {
    let parsed = NetlinkMessage::<RouteNetlinkMessage>::deserialize(raw)
        .map_err(|e| NetlinkError::InvalidArgument(format!("malformed nsid response: {e}")))?;
    match parsed.payload {
        NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewNsId(msg)) => Ok(msg
            .attributes
            .into_iter()
            .find_map(|a| match a {
                NsidAttribute::Id(id) => Some(id),
                _ => None,
            })
            .unwrap_or(NSID_UNASSIGNED)),
        NetlinkPayload::Error(e) => Err(NetlinkError::Rtnetlink(rtnetlink::Error::NetlinkError(e))),
        _ => Ok(NSID_UNASSIGNED),
    }
}

/// On-demand nsid allocation: re-reads after assigning if unassigned (spec
/// §4.1 testable allocation flow).
pub fn ensure_netnsid(ns_fd: i32) -> Result<i32, NetlinkError> {
    let current = get_netnsid(ns_fd)?;
    if current == NSID_UNASSIGNED {
        set_netnsid(ns_fd)
    } else {
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_sentinel_matches_spec() {
        assert_eq!(NSID_UNASSIGNED, -1);
    }
}
