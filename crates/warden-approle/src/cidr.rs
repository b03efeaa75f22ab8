//! CIDR binding for roles and secret identifiers.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::{Error, Result};

/// Parses a list of CIDR blocks.
///
/// Bare addresses are accepted as single-host blocks.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the first malformed entry.
pub fn parse_cidrs<S: AsRef<str>>(raw: &[S]) -> Result<Vec<IpNet>> {
    raw.iter()
        .map(|s| {
            let s = s.as_ref().trim();
            s.parse::<IpNet>()
                .ok()
                .or_else(|| s.parse::<IpAddr>().ok().and_then(host_net))
                .map(|net| net.trunc())
                .ok_or_else(|| Error::invalid(format!("invalid CIDR '{s}'")))
        })
        .collect()
}

fn host_net(addr: IpAddr) -> Option<IpNet> {
    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, prefix).ok()
}

/// Returns true if `addr` is allowed by `cidrs`. An empty list allows everything.
#[must_use]
pub fn allows(cidrs: &[IpNet], addr: IpAddr) -> bool {
    cidrs.is_empty() || cidrs.iter().any(|net| net.contains(&addr))
}

/// Checks that every block in `inner` lies inside some block of `outer`.
///
/// An empty `outer` places no restriction.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the first block outside `outer`.
pub fn ensure_subset(inner: &[IpNet], outer: &[IpNet]) -> Result<()> {
    if outer.is_empty() {
        return Ok(());
    }
    match inner
        .iter()
        .find(|net| !outer.iter().any(|bound| bound.contains(*net)))
    {
        Some(net) => Err(Error::invalid(format!(
            "CIDR '{net}' is not within the role's bound CIDRs"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parse_accepts_blocks_and_addresses() {
        let nets = parse_cidrs(&["10.0.0.0/8", "192.168.1.7", "fd00::/8"]).expect("parse");
        assert_eq!(nets.len(), 3);
        assert_eq!(nets[1].to_string(), "192.168.1.7/32");
    }

    #[test]
    fn parse_normalizes_host_bits() {
        let nets = parse_cidrs(&["10.1.2.3/8"]).expect("parse");
        assert_eq!(nets[0].to_string(), "10.0.0.0/8");
    }

    #[test_case("10.0.0.0/33" ; "bad prefix")]
    #[test_case("not-an-ip" ; "garbage")]
    #[test_case("" ; "empty")]
    fn parse_rejects(raw: &str) {
        assert!(parse_cidrs(&[raw]).is_err());
    }

    #[test_case("10.1.2.3", true ; "inside")]
    #[test_case("11.0.0.1", false ; "outside")]
    #[test_case("::1", false ; "other family")]
    fn allow_checks(addr: &str, expected: bool) {
        let nets = parse_cidrs(&["10.0.0.0/8"]).expect("parse");
        let addr: IpAddr = addr.parse().expect("addr");
        assert_eq!(allows(&nets, addr), expected);
    }

    #[test]
    fn empty_list_allows_everything() {
        assert!(allows(&[], "8.8.8.8".parse().expect("addr")));
    }

    #[test]
    fn subset_rules() {
        let outer = parse_cidrs(&["10.0.0.0/8"]).expect("parse");
        let inside = parse_cidrs(&["10.2.0.0/16", "10.3.3.3"]).expect("parse");
        let outside = parse_cidrs(&["10.0.0.0/7"]).expect("parse");

        assert!(ensure_subset(&inside, &outer).is_ok());
        assert!(ensure_subset(&outside, &outer).is_err());
        assert!(ensure_subset(&outside, &[]).is_ok());
    }
}
