use async_trait::async_trait;
use rusoto_core::Region;
use rusoto_ec2::{DescribeVpcsRequest, Ec2, Ec2Client};

use crate::error::ComplianceError;

pub struct Ec2InstanceClient {
    client: Ec2Client,
}

#[async_trait]
pub trait DescribeNetwork {
    /// Primary CIDR block of the VPC, e.g. `172.31.192.0/20`.
    async fn vpc_cidr_block(&self, vpc_id: &str) -> Result<String, ComplianceError>;
}

#[async_trait]
impl DescribeNetwork for Ec2InstanceClient {
    async fn vpc_cidr_block(&self, vpc_id: &str) -> Result<String, ComplianceError> {
        let request = DescribeVpcsRequest {
            vpc_ids: Some(vec![vpc_id.to_string()]),
            ..DescribeVpcsRequest::default()
        };

        let result = self.client.describe_vpcs(request).await.map_err(|error| {
            ComplianceError::NetworkLookupFailed {
                vpc_id: vpc_id.to_string(),
                message: error.to_string(),
            }
        })?;

        result
            .vpcs
            .ok_or(ComplianceError::MissingValue("Vpcs"))?
            .into_iter()
            .next()
            .and_then(|vpc| vpc.cidr_block)
            .ok_or(ComplianceError::MissingValue("CidrBlock"))
    }
}

impl Ec2InstanceClient {
    pub fn new(region: Region) -> Self {
        Self::new_with_client(Ec2Client::new(region))
    }

    fn new_with_client(client: Ec2Client) -> Self {
        Ec2InstanceClient { client }
    }
}
