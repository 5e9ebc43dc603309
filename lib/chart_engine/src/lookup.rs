use crate::errors::ChartEngineError;
use chart_query::ChartDefinition;
use chart_store::ChartStore;
use log::debug;
use std::sync::Arc;

pub struct ChartDefinitionLookup {
    store: Arc<dyn ChartStore>,
}

impl ChartDefinitionLookup {
    pub fn new(store: Arc<dyn ChartStore>) -> ChartDefinitionLookup {
        ChartDefinitionLookup { store }
    }

    pub async fn lookup(&self, chart_id: i64) -> Result<ChartDefinition, ChartEngineError> {
        match self.store.find_chart(chart_id).await? {
            Some(definition) => {
                debug!(
                    "Chart {} reads {}.{} by {}",
                    chart_id, definition.data_table, definition.y_axis_field, definition.date_field
                );
                Ok(definition)
            }
            None => Err(ChartEngineError::NotFound(chart_id)),
        }
    }
}
