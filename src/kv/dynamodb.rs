//! AWS DynamoDB key-value store backend.
//!
//! One item per message: hash key `id` (string), attribute `message`.
//! `message` is a DynamoDB reserved word, so update expressions go through
//! an expression attribute name alias.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use super::store::{KeyValueStore, MessageRecord};
use crate::config::AwsConfig;

fn item_to_record(item: &HashMap<String, AttributeValue>) -> MessageRecord {
    let field = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_default()
    };
    MessageRecord {
        id: field("id"),
        message: field("message"),
    }
}

/// DynamoDB-backed message store.
pub struct DynamoDbMessageStore {
    client: Client,
    table_name: String,
}

impl DynamoDbMessageStore {
    /// Create a new DynamoDB store.
    ///
    /// Applies the region, custom endpoint (LocalStack), and static
    /// credentials from `config`; empty fields fall back to the standard
    /// AWS credential chain and default endpoints.
    pub async fn new(config: &AwsConfig, table_name: &str) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            loader = loader.endpoint_url(&config.endpoint_url);
        }

        if !config.access_key_id.is_empty() && !config.secret_access_key.is_empty() {
            let creds = aws_sdk_dynamodb::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None,
                None,
                "postbox-config",
            );
            loader = loader.credentials_provider(creds);
        }

        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);

        info!(
            "DynamoDB store initialized: table={} endpoint='{}'",
            table_name, config.endpoint_url
        );

        Ok(Self {
            client,
            table_name: table_name.to_string(),
        })
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("DynamoDB {context}: {err}")
    }

    /// Poll `describe_table` until the table reports ACTIVE.
    async fn wait_until_active(&self) -> anyhow::Result<()> {
        for _ in 0..60 {
            let resp = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("describe_table", e))?;

            if resp.table().and_then(|t| t.table_status())
                == Some(&TableStatus::Active)
            {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        anyhow::bail!("table {} did not become active in time", self.table_name)
    }
}

impl KeyValueStore for DynamoDbMessageStore {
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            // Enumerate existing tables before creating (create-if-absent).
            let mut table_names: Vec<String> = Vec::new();
            let mut start_table: Option<String> = None;
            loop {
                let mut req = self.client.list_tables();
                if let Some(ref name) = start_table {
                    req = req.exclusive_start_table_name(name);
                }
                let resp = req
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error("list_tables", e))?;
                table_names.extend(resp.table_names().iter().cloned());
                match resp.last_evaluated_table_name() {
                    Some(name) => start_table = Some(name.to_string()),
                    None => break,
                }
            }

            if table_names.iter().any(|n| n == &self.table_name) {
                debug!("table {} already exists", self.table_name);
                return Ok(());
            }

            info!("creating table {}", self.table_name);
            let create = self
                .client
                .create_table()
                .table_name(&self.table_name)
                .key_schema(
                    KeySchemaElement::builder()
                        .attribute_name("id")
                        .key_type(KeyType::Hash)
                        .build()?,
                )
                .attribute_definitions(
                    AttributeDefinition::builder()
                        .attribute_name("id")
                        .attribute_type(ScalarAttributeType::S)
                        .build()?,
                )
                .provisioned_throughput(
                    ProvisionedThroughput::builder()
                        .read_capacity_units(1)
                        .write_capacity_units(1)
                        .build()?,
                )
                .send()
                .await;

            if let Err(e) = create {
                let service_err = e.into_service_error();
                // Another instance may have won the create race.
                if !service_err.is_resource_in_use_exception() {
                    return Err(Self::map_sdk_error("create_table", service_err));
                }
            }

            self.wait_until_active().await
        })
    }

    fn put_message(
        &self,
        record: MessageRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            debug!("put_item: table={} id={}", self.table_name, record.id);
            self.client
                .put_item()
                .table_name(&self.table_name)
                .item("id", AttributeValue::S(record.id))
                .item("message", AttributeValue::S(record.message))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_item", e))?;
            Ok(())
        })
    }

    fn get_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<MessageRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("get_item", e))?;

            Ok(result.item().map(item_to_record))
        })
    }

    fn list_messages(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<MessageRecord>>> + Send + '_>> {
        Box::pin(async move {
            let mut records = Vec::new();
            let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

            loop {
                let mut scan = self.client.scan().table_name(&self.table_name);
                if let Some(key) = &exclusive_start_key {
                    scan = scan.set_exclusive_start_key(Some(key.clone()));
                }

                let result = scan
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error("scan", e))?;

                for item in result.items() {
                    records.push(item_to_record(item));
                }

                if result.last_evaluated_key().is_none() {
                    break;
                }
                exclusive_start_key = result.last_evaluated_key().cloned();
            }

            Ok(records)
        })
    }

    fn update_message(
        &self,
        id: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let id = id.to_string();
        let message = message.to_string();
        Box::pin(async move {
            let result = self
                .client
                .update_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id))
                .update_expression("SET #message = :val")
                .condition_expression("attribute_exists(id)")
                .expression_attribute_names("#message", "message")
                .expression_attribute_values(":val", AttributeValue::S(message))
                .send()
                .await;

            match result {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_conditional_check_failed_exception() {
                        Ok(false)
                    } else {
                        Err(Self::map_sdk_error("update_item", service_err))
                    }
                }
            }
        })
    }

    fn delete_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let result = self
                .client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id))
                .condition_expression("attribute_exists(id)")
                .send()
                .await;

            match result {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_conditional_check_failed_exception() {
                        Ok(false)
                    } else {
                        Err(Self::map_sdk_error("delete_item", service_err))
                    }
                }
            }
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_to_record() {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S("abc".to_string()));
        item.insert(
            "message".to_string(),
            AttributeValue::S("hello".to_string()),
        );

        let record = item_to_record(&item);
        assert_eq!(record.id, "abc");
        assert_eq!(record.message, "hello");
    }

    #[test]
    fn test_item_to_record_missing_fields() {
        let item = HashMap::new();
        let record = item_to_record(&item);
        assert_eq!(record.id, "");
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_item_to_record_ignores_non_string_values() {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::N("42".to_string()));
        let record = item_to_record(&item);
        assert_eq!(record.id, "");
    }
}
