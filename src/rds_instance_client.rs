use async_trait::async_trait;
use rusoto_core::{Region, RusotoError};
use rusoto_rds::{
    CloudwatchLogsExportConfiguration, DescribeDBClustersMessage, DescribeDBInstancesMessage,
    ModifyDBClusterMessage, ModifyDBInstanceMessage, Rds, RdsClient,
};

use crate::error::ComplianceError;
use crate::profile::{ResourceKind, ResourceProfile};

const ALREADY_MODIFIED_CODE: &str = "InvalidParameterCombination";

pub struct RdsInstanceClient {
    client: RdsClient,
}

#[derive(Debug, PartialEq)]
pub enum ModifyFailure {
    /// The service refused because the resource already carries the requested exports.
    AlreadyInDesiredState,
    Transient(String),
}

#[async_trait]
pub trait DescribeDatabase {
    async fn describe_instance(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<ResourceProfile, ComplianceError>;
}

#[async_trait]
pub trait ModifyLogExports {
    async fn modify_log_exports(
        &self,
        identifier: &str,
        kind: ResourceKind,
        streams: &[String],
    ) -> Result<(), ModifyFailure>;
}

#[async_trait]
impl DescribeDatabase for RdsInstanceClient {
    async fn describe_instance(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<ResourceProfile, ComplianceError> {
        let describe_failed = |message: String| ComplianceError::DescribeFailed {
            identifier: identifier.to_string(),
            message,
        };

        match kind {
            ResourceKind::SingleInstance => {
                let result = self
                    .client
                    .describe_db_instances(DescribeDBInstancesMessage {
                        db_instance_identifier: Some(identifier.to_string()),
                        ..DescribeDBInstancesMessage::default()
                    })
                    .await
                    .map_err(|error| describe_failed(error.to_string()))?;
                let instance = result
                    .db_instances
                    .and_then(|instances| instances.into_iter().next())
                    .ok_or(ComplianceError::MissingValue("DBInstances"))?;

                Ok(ResourceProfile {
                    identifier: instance
                        .db_instance_identifier
                        .unwrap_or_else(|| identifier.to_string()),
                    kind,
                    engine_type: instance.engine.ok_or(ComplianceError::MissingValue("Engine"))?,
                    exported_log_streams: instance
                        .enabled_cloudwatch_logs_exports
                        .unwrap_or_default()
                        .into_iter()
                        .collect(),
                    vpc_id: instance.db_subnet_group.and_then(|group| group.vpc_id),
                })
            }
            ResourceKind::Clustered => {
                let result = self
                    .client
                    .describe_db_clusters(DescribeDBClustersMessage {
                        db_cluster_identifier: Some(identifier.to_string()),
                        ..DescribeDBClustersMessage::default()
                    })
                    .await
                    .map_err(|error| describe_failed(error.to_string()))?;
                let cluster = result
                    .db_clusters
                    .and_then(|clusters| clusters.into_iter().next())
                    .ok_or(ComplianceError::MissingValue("DBClusters"))?;

                Ok(ResourceProfile {
                    identifier: cluster
                        .db_cluster_identifier
                        .unwrap_or_else(|| identifier.to_string()),
                    kind,
                    engine_type: cluster.engine.ok_or(ComplianceError::MissingValue("Engine"))?,
                    exported_log_streams: cluster
                        .enabled_cloudwatch_logs_exports
                        .unwrap_or_default()
                        .into_iter()
                        .collect(),
                    vpc_id: None,
                })
            }
        }
    }
}

#[async_trait]
impl ModifyLogExports for RdsInstanceClient {
    async fn modify_log_exports(
        &self,
        identifier: &str,
        kind: ResourceKind,
        streams: &[String],
    ) -> Result<(), ModifyFailure> {
        let export_configuration = Some(CloudwatchLogsExportConfiguration {
            enable_log_types: Some(streams.to_vec()),
            disable_log_types: None,
        });

        match kind {
            ResourceKind::SingleInstance => self
                .client
                .modify_db_instance(ModifyDBInstanceMessage {
                    db_instance_identifier: identifier.to_string(),
                    cloudwatch_logs_export_configuration: export_configuration,
                    ..ModifyDBInstanceMessage::default()
                })
                .await
                .map(|_| ())
                .map_err(classify_modify_error),
            ResourceKind::Clustered => self
                .client
                .modify_db_cluster(ModifyDBClusterMessage {
                    db_cluster_identifier: identifier.to_string(),
                    cloudwatch_logs_export_configuration: export_configuration,
                    ..ModifyDBClusterMessage::default()
                })
                .await
                .map(|_| ())
                .map_err(classify_modify_error),
        }
    }
}

impl RdsInstanceClient {
    pub fn new(region: Region) -> Self {
        Self::new_with_client(RdsClient::new(region))
    }

    fn new_with_client(client: RdsClient) -> Self {
        RdsInstanceClient { client }
    }
}

// InvalidParameterCombination is not modelled by rusoto_rds, so it arrives as an
// unknown response whose body still carries the query-protocol error code.
fn classify_modify_error<E: std::error::Error + 'static>(error: RusotoError<E>) -> ModifyFailure {
    match error {
        RusotoError::Unknown(ref response)
            if error_code(response.body_as_str()) == Some(ALREADY_MODIFIED_CODE) =>
        {
            ModifyFailure::AlreadyInDesiredState
        }
        error => ModifyFailure::Transient(error.to_string()),
    }
}

fn error_code(body: &str) -> Option<&str> {
    let start = body.find("<Code>")? + "<Code>".len();
    let end = body[start..].find("</Code>")? + start;
    Some(body[start..end].trim())
}

#[cfg(test)]
mod tests {
    use crate::profile::{ResourceKind, ResourceProfile};
    use crate::rds_instance_client::{
        error_code, DescribeDatabase, ModifyFailure, ModifyLogExports, RdsInstanceClient,
    };
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MockResponseReader, ReadMockResponse,
    };
    use rusoto_rds::RdsClient;

    fn client_with(dispatcher: MockRequestDispatcher) -> RdsInstanceClient {
        RdsInstanceClient::new_with_client(RdsClient::new_with(
            dispatcher,
            MockCredentialsProvider,
            Default::default(),
        ))
    }

    fn streams(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn test_describe_instance() {
        let client = client_with(MockRequestDispatcher::default().with_body(
            &*MockResponseReader::read_response(
                "test_resources/valid",
                "describe_db_instances.xml",
            ),
        ));

        let result = client
            .describe_instance("db-1", ResourceKind::SingleInstance)
            .await;

        let mut expected =
            ResourceProfile::new("db-1", ResourceKind::SingleInstance, "mysql", vec!["error"]);
        expected.vpc_id = Some("vpc-0a1b2c3d".to_string());
        assert_eq!(result.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_describe_instance_error() {
        let client = client_with(MockRequestDispatcher::with_status(404).with_body(
            &*MockResponseReader::read_response(
                "test_resources/error",
                "db_instance_not_found.xml",
            ),
        ));

        let result = client
            .describe_instance("db-404", ResourceKind::SingleInstance)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_modify_log_exports() {
        let client = client_with(MockRequestDispatcher::default());

        let result = client
            .modify_log_exports(
                "db-1",
                ResourceKind::SingleInstance,
                &streams(&["audit", "error", "general"]),
            )
            .await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_modify_already_modified_is_desired_state() {
        let client = client_with(MockRequestDispatcher::with_status(400).with_body(
            &*MockResponseReader::read_response(
                "test_resources/error",
                "invalid_parameter_combination.xml",
            ),
        ));

        let result = client
            .modify_log_exports("db-1", ResourceKind::Clustered, &streams(&["audit"]))
            .await;

        assert_eq!(result, Err(ModifyFailure::AlreadyInDesiredState));
    }

    #[tokio::test]
    async fn test_modify_other_errors_are_transient() {
        let client = client_with(MockRequestDispatcher::with_status(400).with_body(
            &*MockResponseReader::read_response("test_resources/error", "invalid_state.xml"),
        ));

        let result = client
            .modify_log_exports("db-1", ResourceKind::SingleInstance, &streams(&["audit"]))
            .await;

        assert!(matches!(result, Err(ModifyFailure::Transient(_))));
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            error_code("<ErrorResponse><Error><Code>Throttling</Code></Error></ErrorResponse>"),
            Some("Throttling")
        );
        assert_eq!(error_code("<ErrorResponse/>"), None);
    }
}
