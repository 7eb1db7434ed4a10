use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;

/// What an engine has to export and which log line marks a failed login.
#[derive(Debug, Clone, PartialEq)]
pub struct RemediationPolicy {
    pub engine_type: String,
    pub required_log_streams: BTreeSet<String>,
    pub failure_keyword: &'static str,
    pub log_group_suffix: &'static str,
}

struct PolicyEntry {
    streams: &'static [&'static str],
    failure_keyword: &'static str,
    log_group_suffix: &'static str,
}

const MYSQL_FAMILY: PolicyEntry = PolicyEntry {
    streams: &["audit", "error", "general"],
    failure_keyword: "Access denied",
    log_group_suffix: "/error",
};

const ORACLE_FAMILY: PolicyEntry = PolicyEntry {
    streams: &["audit"],
    failure_keyword: "1017 RETURNCODE",
    log_group_suffix: "/audit",
};

static POLICIES: Lazy<HashMap<&'static str, PolicyEntry>> = Lazy::new(|| {
    let mut policies = HashMap::new();
    policies.insert("mariadb", MYSQL_FAMILY);
    policies.insert("mysql", MYSQL_FAMILY);
    policies.insert("aurora", MYSQL_FAMILY);
    policies.insert(
        "postgres",
        PolicyEntry {
            streams: &["postgresql"],
            failure_keyword: "password authentication failed",
            log_group_suffix: "/postgresql",
        },
    );
    policies.insert("oracle", ORACLE_FAMILY);
    policies.insert("oracle-ee", ORACLE_FAMILY);
    policies
});

impl RemediationPolicy {
    /// Unknown engines resolve to an empty policy, which every profile satisfies.
    pub fn resolve(engine_type: &str) -> Self {
        match POLICIES.get(engine_type) {
            Some(entry) => RemediationPolicy {
                engine_type: engine_type.to_string(),
                required_log_streams: entry.streams.iter().map(|s| s.to_string()).collect(),
                failure_keyword: entry.failure_keyword,
                log_group_suffix: entry.log_group_suffix,
            },
            None => RemediationPolicy {
                engine_type: engine_type.to_string(),
                required_log_streams: BTreeSet::new(),
                failure_keyword: "",
                log_group_suffix: "",
            },
        }
    }

    pub fn is_known(&self) -> bool {
        POLICIES.contains_key(self.engine_type.as_str())
    }

    pub fn required_streams(&self) -> Vec<String> {
        self.required_log_streams.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::RemediationPolicy;

    #[test]
    fn test_resolve_mysql_family() {
        for engine in &["mysql", "mariadb", "aurora"] {
            let policy = RemediationPolicy::resolve(engine);
            assert_eq!(policy.required_streams(), vec!["audit", "error", "general"]);
            assert_eq!(policy.failure_keyword, "Access denied");
            assert_eq!(policy.log_group_suffix, "/error");
            assert!(policy.is_known());
        }
    }

    #[test]
    fn test_resolve_postgres_and_oracle() {
        let postgres = RemediationPolicy::resolve("postgres");
        assert_eq!(postgres.required_streams(), vec!["postgresql"]);
        assert_eq!(postgres.failure_keyword, "password authentication failed");
        assert_eq!(postgres.log_group_suffix, "/postgresql");

        let oracle = RemediationPolicy::resolve("oracle-ee");
        assert_eq!(oracle.required_streams(), vec!["audit"]);
        assert_eq!(oracle.failure_keyword, "1017 RETURNCODE");
        assert_eq!(oracle.log_group_suffix, "/audit");
    }

    #[test]
    fn test_resolve_unknown_engine_is_empty() {
        let policy = RemediationPolicy::resolve("unknown-engine");
        assert!(policy.required_log_streams.is_empty());
        assert_eq!(policy.failure_keyword, "");
        assert_eq!(policy.log_group_suffix, "");
        assert!(!policy.is_known());
    }
}
