//! IP rule enumerate/add/del (spec §4.1, §4.4 "Rules").

use std::net::IpAddr;

use futures::TryStreamExt;
use ifstated_model::route::{Family, RuleAction};
use netlink_packet_route::rule::{RuleAction as NlRuleAction, RuleAttribute, RuleMessage};
use netlink_packet_route::AddressFamily;

use crate::context::NamespaceContext;
use crate::error::NetlinkError;

#[derive(Clone, Debug)]
pub struct LiveRule {
    pub message: RuleMessage,
    pub priority: u32,
    pub iif: Option<String>,
    pub oif: Option<String>,
}

fn family_of(family: Family) -> AddressFamily {
    match family {
        Family::Inet => AddressFamily::Inet,
        Family::Inet6 => AddressFamily::Inet6,
    }
}

fn priority_of(msg: &RuleMessage) -> u32 {
    msg.attributes
        .iter()
        .find_map(|a| match a {
            RuleAttribute::Priority(p) => Some(*p),
            _ => None,
        })
        .unwrap_or(0)
}

fn iif_of(msg: &RuleMessage) -> Option<String> {
    msg.attributes.iter().find_map(|a| match a {
        RuleAttribute::Iifname(name) => Some(name.clone()),
        _ => None,
    })
}

fn oif_of(msg: &RuleMessage) -> Option<String> {
    msg.attributes.iter().find_map(|a| match a {
        RuleAttribute::Oifname(name) => Some(name.clone()),
        _ => None,
    })
}

impl NamespaceContext {
    pub async fn enumerate_rules(&self, family: Family) -> Result<Vec<LiveRule>, NetlinkError> {
        let mut stream = self.handle.rule().get(family_of(family)).execute();
        let mut out = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            out.push(LiveRule {
                priority: priority_of(&msg),
                iif: iif_of(&msg),
                oif: oif_of(&msg),
                message: msg,
            });
        }
        Ok(out)
    }

    /// Add a rule. `action` maps onto `FRA_TABLE`/the message's action byte
    /// depending on variant (spec §4.4 Rules).
    #[allow(clippy::too_many_arguments)]
    pub async fn rule_add(
        &self,
        family: Family,
        priority: u32,
        action: &RuleAction,
        src: Option<IpAddr>,
        src_len: Option<u8>,
        iif: Option<&str>,
        oif: Option<&str>,
        fwmark: Option<u32>,
        tos: Option<u8>,
        suppress_prefixlength: Option<i32>,
        suppress_ifgroup: Option<u32>,
    ) -> Result<(), NetlinkError> {
        let mut request = self.handle.rule().add();
        let message = request.message_mut();
        message.header.family = family_of(family);
        message.attributes.push(RuleAttribute::Priority(priority));
        if let (Some(addr), Some(len)) = (src, src_len) {
            message.header.src_len = len;
            message.attributes.push(RuleAttribute::Source(addr));
        }
        if let Some(name) = iif {
            message.attributes.push(RuleAttribute::Iifname(name.to_string()));
        }
        if let Some(name) = oif {
            message.attributes.push(RuleAttribute::Oifname(name.to_string()));
        }
        if let Some(mark) = fwmark {
            message.attributes.push(RuleAttribute::FwMark(mark));
        }
        if let Some(tos) = tos {
            message.header.tos = tos;
        }
        if let Some(spl) = suppress_prefixlength {
            message.attributes.push(RuleAttribute::SuppressPrefixLen(spl as u32));
        }
        if let Some(ifg) = suppress_ifgroup {
            message.attributes.push(RuleAttribute::SuppressIfGroup(ifg));
        }
        match action {
            RuleAction::ToTable(table) => {
                message.header.action = NlRuleAction::ToTable;
                message.attributes.push(RuleAttribute::Table(*table));
            }
            RuleAction::Unicast => message.header.action = NlRuleAction::ToTable,
            RuleAction::Blackhole => message.header.action = NlRuleAction::Blackhole,
            RuleAction::Unreachable => message.header.action = NlRuleAction::Unreachable,
            RuleAction::Prohibit => message.header.action = NlRuleAction::Prohibit,
            RuleAction::Nat(_addr) => {
                message.header.action = NlRuleAction::Nat;
            }
        }
        request.execute().await?;
        Ok(())
    }

    pub async fn rule_del(&self, rule: LiveRule) -> Result<(), NetlinkError> {
        self.handle.rule().del(rule.message).execute().await?;
        Ok(())
    }
}
