use std::path::{Path, PathBuf};

/// Capability that loaded code may be granted for an invocation.
///
/// The runtime builds a [`Policy`] from its configuration and hands it to
/// every invocation through a
/// [`SandboxedContext`](crate::sandbox::SandboxedContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Network access restricted to specific hosts.
    Network {
        /// Host patterns the action may connect to.
        allowed_hosts: Vec<String>,
    },
    /// Filesystem access restricted to specific paths.
    FileSystem {
        /// Allowed path prefixes.
        paths: Vec<PathBuf>,
        /// If `true`, only read access is permitted.
        read_only: bool,
    },
    /// Access to specific environment variables.
    Environment {
        /// Variable names the action may read.
        keys: Vec<String>,
    },
    /// Spawning child processes.
    Process,
}

impl Capability {
    /// Whether this granted capability covers `required`.
    pub fn covers(&self, required: &Capability) -> bool {
        match (self, required) {
            (Self::Process, Self::Process) => true,
            (Self::Environment { keys: g }, Self::Environment { keys: r }) => {
                r.iter().all(|key| g.contains(key))
            }
            (Self::Network { allowed_hosts: g }, Self::Network { allowed_hosts: r }) => r
                .iter()
                .all(|host| g.iter().any(|pattern| host_matches(pattern, host))),
            (
                Self::FileSystem {
                    paths: g_paths,
                    read_only: g_ro,
                },
                Self::FileSystem {
                    paths: r_paths,
                    read_only: r_ro,
                },
            ) => {
                if *g_ro && !r_ro {
                    return false;
                }
                r_paths
                    .iter()
                    .all(|rp| g_paths.iter().any(|gp| rp.starts_with(gp)))
            }
            _ => false,
        }
    }
}

/// The set of capabilities granted to loaded code.
///
/// An empty policy denies everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    granted: Vec<Capability>,
}

impl Policy {
    pub fn new(granted: Vec<Capability>) -> Self {
        Self { granted }
    }

    /// A policy that denies every check.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Add a capability to the granted set.
    pub fn grant(mut self, capability: Capability) -> Self {
        self.granted.push(capability);
        self
    }

    pub fn granted(&self) -> &[Capability] {
        &self.granted
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    /// Whether any granted capability covers `required`.
    pub fn permits(&self, required: &Capability) -> bool {
        self.granted.iter().any(|g| g.covers(required))
    }

    pub fn permits_host(&self, host: &str) -> bool {
        self.permits(&Capability::Network {
            allowed_hosts: vec![host.to_owned()],
        })
    }

    pub fn permits_path(&self, path: &Path, write: bool) -> bool {
        self.permits(&Capability::FileSystem {
            paths: vec![path.to_path_buf()],
            read_only: !write,
        })
    }

    pub fn permits_env(&self, key: &str) -> bool {
        self.permits(&Capability::Environment {
            keys: vec![key.to_owned()],
        })
    }
}

/// Host pattern matching.
///
/// `*` matches any host; `*.example.com` matches `example.com` and any
/// subdomain of it. Comparison ignores ASCII case.
pub(crate) fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if let Some(suffix) = pattern.strip_prefix("*.") {
        host == suffix
            || host
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.'))
    } else {
        pattern == host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*", "anything.at.all", true)]
    #[case("*.example.com", "api.example.com", true)]
    #[case("*.example.com", "example.com", true)]
    #[case("*.example.com", "badexample.com", false)]
    #[case("*.example.com", "evil.com", false)]
    #[case("api.github.com", "API.github.com", true)]
    #[case("api.github.com", "github.com", false)]
    #[case("*.example.com", "API.EXAMPLE.COM", true)]
    #[case("*.Example.com", "api.example.COM", true)]
    #[case("*.example.com", "EXAMPLE.com", true)]
    #[case("*.example.com", "BADEXAMPLE.COM", false)]
    fn host_patterns(#[case] pattern: &str, #[case] host: &str, #[case] expected: bool) {
        assert_eq!(host_matches(pattern, host), expected);
    }

    #[test]
    fn filesystem_read_only_blocks_write() {
        let granted = Capability::FileSystem {
            paths: vec!["/data".into()],
            read_only: true,
        };
        let required = Capability::FileSystem {
            paths: vec!["/data/file.txt".into()],
            read_only: false,
        };
        assert!(!granted.covers(&required));
    }

    #[test]
    fn filesystem_prefix_is_per_component() {
        let policy = Policy::deny_all().grant(Capability::FileSystem {
            paths: vec!["/data".into()],
            read_only: false,
        });
        assert!(policy.permits_path(Path::new("/data/sub/file.txt"), true));
        assert!(!policy.permits_path(Path::new("/database"), false));
        assert!(!policy.permits_path(Path::new("/etc/passwd"), false));
    }

    #[test]
    fn environment_keys_subset() {
        let granted = Capability::Environment {
            keys: vec!["HOME".into(), "PATH".into()],
        };
        assert!(granted.covers(&Capability::Environment {
            keys: vec!["HOME".into()]
        }));
        assert!(!granted.covers(&Capability::Environment {
            keys: vec!["HOME".into(), "SECRET".into()]
        }));
    }

    #[test]
    fn different_kinds_dont_match() {
        let granted = Capability::Process;
        assert!(!granted.covers(&Capability::Environment { keys: vec![] }));
    }

    #[test]
    fn empty_policy_denies_everything() {
        let policy = Policy::deny_all();
        assert!(policy.is_empty());
        assert!(!policy.permits(&Capability::Process));
        assert!(!policy.permits_host("localhost"));
        assert!(!policy.permits_env("HOME"));
    }
}
