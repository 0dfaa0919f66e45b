//! Route and rule reconcilers (spec §4.4 "Routes"/"Rules").

use std::net::IpAddr;

use ifstated_model::collection::IndexedCollection;
use ifstated_model::route::{route_proto_ignored, Family, RouteKey, RouteModel, RuleKey, RuleModel};
use ifstated_netlink::context::NamespaceContext;
use ifstated_netlink::route_ops::LiveRoute;
use ifstated_netlink::rule_ops::LiveRule;
use ifstated_netlink::NetlinkError;
use tracing::info;

fn parse_dst(dst: &str) -> Option<(IpAddr, u8)> {
    if dst == "default" {
        return None;
    }
    ifstated_model::link::parse_cidr(dst)
}

/// Resolve `oif` (an ifname) to a live ifindex. Returns `None` when the name
/// doesn't resolve, in which case the caller downgrades the route to
/// `forced_down` (spec §4.4 Routes).
pub trait OifResolver {
    fn resolve_oif(&self, ifname: &str) -> Option<u32>;
}

pub async fn reconcile_routes(
    ctx: &NamespaceContext,
    family: Family,
    desired: &IndexedCollection<RouteKey, RouteModel>,
    resolver: &impl OifResolver,
    apply: bool,
) -> Result<(), NetlinkError> {
    let live_list = ctx.enumerate_routes(family).await?;
    let live: IndexedCollection<RouteKey, LiveRoute> = live_list
        .into_iter()
        .map(|r| {
            let dst = r.dst.map(|(ip, plen)| format!("{ip}/{plen}")).unwrap_or_else(|| "default".to_string());
            (RouteKey { dst, priority: r.priority, table: r.table, tos: 0, proto: r.proto }, r)
        })
        .collect();

    for (key, model) in desired.iter() {
        let dst = parse_dst(&key.dst);
        if dst.map(|(ip, _)| Family::of(&ip)) != Some(family) && dst.is_some() {
            continue;
        }
        let oif = model.oif.as_deref().and_then(|name| resolver.resolve_oif(name));
        let forced_down = model.oif.is_some() && oif.is_none() && model.gateway.is_some();
        if forced_down {
            continue;
        }

        let matches_live = live.get(key).is_some();
        info!(route = %key.dst, priority = key.priority, table = key.table, action = if matches_live { "=" } else { "+" }, "route");
        if apply {
            ctx.route_replace(dst, key.priority, key.table, model.gateway, model.via.as_ref().map(|v| v.addr), oif, key.proto).await?;
        }
    }

    for (key, live_route) in live.iter() {
        if desired.get(key).is_some() {
            continue;
        }
        if route_proto_ignored(live_route.proto) {
            continue;
        }
        info!(route = %key.dst, priority = key.priority, table = key.table, "- route");
        if apply {
            ctx.route_del(live_route.clone()).await?;
        }
    }

    Ok(())
}

pub async fn reconcile_rules(
    ctx: &NamespaceContext,
    family: Family,
    desired: &IndexedCollection<RuleKey, RuleModel>,
    apply: bool,
) -> Result<(), NetlinkError> {
    let live_list = ctx.enumerate_rules(family).await?;
    let live: IndexedCollection<RuleKey, LiveRule> = live_list
        .into_iter()
        .map(|r| {
            (
                RuleKey { priority: r.priority, iif: r.iif.clone(), oif: r.oif.clone(), dst: None, metric: None, protocol: None },
                r,
            )
        })
        .collect();

    for (key, model) in desired.iter() {
        if model.family != family {
            continue;
        }
        if live.get(key).is_some() {
            info!(priority = key.priority, "= rule");
            continue;
        }
        let src = model.src.as_deref().and_then(|s| s.split('/').next()).and_then(|ip| ip.parse().ok());
        let src_len = model.src.as_deref().and_then(|s| s.split_once('/')).and_then(|(_, l)| l.parse().ok());
        info!(priority = key.priority, "+ rule");
        if apply {
            ctx.rule_add(
                family,
                key.priority,
                &model.action,
                src,
                src_len,
                key.iif.as_deref(),
                key.oif.as_deref(),
                model.fwmark,
                model.tos,
                model.suppress_prefixlength,
                model.suppress_ifgroup,
            )
            .await?;
        }
    }

    for (key, live_rule) in live.iter() {
        if desired.get(key).is_some() {
            continue;
        }
        info!(priority = key.priority, "- rule");
        if apply {
            ctx.rule_del(live_rule.clone()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_route_dst_parses_to_none() {
        assert_eq!(parse_dst("default"), None);
        assert_eq!(parse_dst("10.0.0.0/24"), Some(("10.0.0.0".parse().unwrap(), 24)));
    }
}
