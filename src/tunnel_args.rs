use crate::config::TunnelProfile;
use crate::error::{Error, Result};

pub const DEFAULT_TUNNEL_BINARY: &str = "cloudflared";
pub const LOCAL_BIND: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub local_port: u16,
}

fn parse_port(profile: &TunnelProfile) -> Result<u16> {
    match profile.port.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::InvalidPort {
            profile: profile.name.clone(),
            port: profile.port.clone(),
        }),
    }
}

pub fn build_invocation(profile: &TunnelProfile, program: &str) -> Result<Invocation> {
    let local_port = parse_port(profile)?;

    // cloudflared access tcp --hostname <host> --url 127.0.0.1:<port>
    let args = vec![
        "access".to_string(),
        "tcp".to_string(),
        "--hostname".to_string(),
        profile.host.clone(),
        "--url".to_string(),
        format!("{}:{}", LOCAL_BIND, local_port),
    ];

    Ok(Invocation {
        program: program.to_string(),
        args,
        local_port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(port: &str) -> TunnelProfile {
        TunnelProfile {
            name: "alias1".into(),
            host: "https://kubernetes.foo.bar.com".into(),
            port: port.into(),
            env_vars: vec![],
        }
    }

    #[test]
    fn builds_cloudflared_access_tcp() {
        let inv = build_invocation(&profile("1234"), DEFAULT_TUNNEL_BINARY).unwrap();
        assert_eq!(inv.program, "cloudflared");
        assert_eq!(
            inv.args,
            vec![
                "access",
                "tcp",
                "--hostname",
                "https://kubernetes.foo.bar.com",
                "--url",
                "127.0.0.1:1234"
            ]
        );
        assert_eq!(inv.local_port, 1234);
    }

    #[test]
    fn custom_binary_is_used() {
        let inv = build_invocation(&profile("5555"), "/opt/bin/cloudflared").unwrap();
        assert_eq!(inv.program, "/opt/bin/cloudflared");
    }

    #[test]
    fn rejects_ports_that_cannot_be_bound() {
        for bad in ["abc", "0", "70000", "-1"] {
            let err =
                build_invocation(&profile(bad), DEFAULT_TUNNEL_BINARY).unwrap_err();
            assert!(
                matches!(err, Error::InvalidPort { ref port, .. } if port == bad),
                "port {bad} should be rejected"
            );
        }
    }
}
