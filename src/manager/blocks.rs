//! Configuration blocks.

use serde::{Deserialize, Serialize};

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::values::resolve_value;
use crate::manager::Manager;
use crate::model::{BlockType, ConfigMap, ValueSource};

/// A block as seen by callers: scope name plus literal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationBlock {
    pub name: String,
    pub content: String,
}

impl Manager {
    /// Every block of the instance, resolved, in scope order.
    pub async fn list_blocks(&self, instance_name: &str) -> ManagerResult<Vec<ConfigurationBlock>> {
        let instance = self.get_instance(instance_name).await?;
        let config_maps = self.api::<ConfigMap>();

        let mut blocks = Vec::new();
        for (block_type, source) in instance.spec.blocks.iter().flatten() {
            blocks.push(ConfigurationBlock {
                name: block_type.to_string(),
                content: resolve_value(&config_maps, source).await?,
            });
        }
        Ok(blocks)
    }

    /// Sets the inline content of a block, creating it when absent.
    pub async fn update_block(&self, instance_name: &str, block: ConfigurationBlock) -> ManagerResult<()> {
        let block_type: BlockType = block
            .name
            .parse()
            .map_err(|_| ManagerError::validation(format!("block \"{}\" is not allowed", block.name)))?;

        self.mutate_instance(instance_name, |instance| {
            instance
                .spec
                .blocks
                .get_or_insert_with(Default::default)
                .insert(block_type, ValueSource::inline(block.content.clone()));
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, block = %block_type, "Block updated");
        Ok(())
    }

    pub async fn delete_block(&self, instance_name: &str, block_name: &str) -> ManagerResult<()> {
        let not_found = || ManagerError::not_found(format!("block \"{}\" not found", block_name));
        let block_type: BlockType = block_name.parse().map_err(|_| not_found())?;

        self.mutate_instance(instance_name, |instance| {
            let blocks = instance.spec.blocks.as_mut().ok_or_else(not_found)?;
            blocks.remove(&block_type).ok_or_else(not_found)?;
            if blocks.is_empty() {
                instance.spec.blocks = None;
            }
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, block = %block_type, "Block deleted");
        Ok(())
    }
}
