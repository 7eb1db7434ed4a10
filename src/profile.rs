use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    SingleInstance,
    Clustered,
}

impl ResourceKind {
    pub fn log_group_prefix(self) -> &'static str {
        match self {
            ResourceKind::SingleInstance => "/aws/rds/instance/",
            ResourceKind::Clustered => "/aws/rds/cluster/",
        }
    }

    pub fn from_resource_type(resource_type: &str) -> Option<ResourceKind> {
        match resource_type {
            "AWS::RDS::DBInstance" => Some(ResourceKind::SingleInstance),
            "AWS::RDS::DBCluster" => Some(ResourceKind::Clustered),
            _ => None,
        }
    }
}

/// Configuration of one database resource as observed at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceProfile {
    pub identifier: String,
    pub kind: ResourceKind,
    pub engine_type: String,
    pub exported_log_streams: BTreeSet<String>,
    pub vpc_id: Option<String>,
}

#[cfg(test)]
impl ResourceProfile {
    pub fn new<I, S>(identifier: &str, kind: ResourceKind, engine_type: &str, streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResourceProfile {
            identifier: identifier.to_string(),
            kind,
            engine_type: engine_type.to_string(),
            exported_log_streams: streams.into_iter().map(Into::into).collect(),
            vpc_id: None,
        }
    }
}
