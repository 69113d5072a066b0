use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record types shared by every DNS zone kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Srv,
    Ns,
    Caa,
    Ptr,
}

impl DnsRecordType {
    /// Literal the DNS providers expect
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Mx => "MX",
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Srv => "SRV",
            DnsRecordType::Ns => "NS",
            DnsRecordType::Caa => "CAA",
            DnsRecordType::Ptr => "PTR",
        }
    }

    /// Types that can be proxied through an edge network
    pub fn is_proxiable(&self) -> bool {
        matches!(
            self,
            DnsRecordType::A | DnsRecordType::Aaaa | DnsRecordType::Cname
        )
    }

    /// Types that carry a priority field
    pub fn has_priority(&self) -> bool {
        matches!(self, DnsRecordType::Mx | DnsRecordType::Srv)
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercase() {
        let t: DnsRecordType = serde_json::from_str("\"AAAA\"").unwrap();
        assert_eq!(t, DnsRecordType::Aaaa);
        assert_eq!(t.to_string(), "AAAA");
        assert!(serde_json::from_str::<DnsRecordType>("\"aaaa\"").is_err());
    }
}
