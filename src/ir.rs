use serde::{Deserialize, Serialize};

/// One stage of the production chain as delivered by the calculation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowStep {
    pub id: String,
    pub label: Option<String>,
    pub item_id: Option<String>,
    pub recipe_id: Option<String>,
    pub machine_id: Option<String>,
    pub items: Option<f64>,
    pub machines: Option<f64>,
    pub power: Option<f64>,
    pub belts: Option<f64>,
    pub wagons: Option<f64>,
    pub recipe_productivity: Option<f64>,
    pub is_technology: bool,
    pub excluded: bool,
    pub color: Option<String>,
    /// Where this step's output goes.
    pub outputs: Vec<StepTransfer>,
}

/// A quantity of one item moving from the owning step to a consumer step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepTransfer {
    pub consumer: String,
    pub item_id: String,
    pub items: f64,
}

impl FlowStep {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_items(mut self, items: f64) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_recipe(mut self, recipe_id: &str) -> Self {
        self.recipe_id = Some(recipe_id.to_string());
        self
    }

    pub fn feeding(mut self, consumer: &str, item_id: &str, items: f64) -> Self {
        self.outputs.push(StepTransfer {
            consumer: consumer.to_string(),
            item_id: item_id.to_string(),
            items,
        });
        self
    }

    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.recipe_id.clone())
            .or_else(|| self.item_id.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Accepts either a bare step array or `{ "steps": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlowDocument {
    Steps(Vec<FlowStep>),
    Wrapped { steps: Vec<FlowStep> },
}

pub fn parse_flow_steps(input: &str) -> serde_json::Result<Vec<FlowStep>> {
    let doc: FlowDocument = serde_json::from_str(input)?;
    Ok(match doc {
        FlowDocument::Steps(steps) => steps,
        FlowDocument::Wrapped { steps } => steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_wrapped_documents() {
        let bare = r#"[{"id":"a","items":2,"outputs":[{"consumer":"b","itemId":"plate","items":2}]},{"id":"b"}]"#;
        let wrapped = format!("{{\"steps\":{bare}}}");
        let a = parse_flow_steps(bare).unwrap();
        let b = parse_flow_steps(&wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].outputs[0].item_id, "plate");
        assert!(!a[1].is_technology);
    }

    #[test]
    fn display_label_falls_back_to_id() {
        let step = FlowStep::new("s1");
        assert_eq!(step.display_label(), "s1");
        let step = FlowStep::new("s1").with_recipe("gear");
        assert_eq!(step.display_label(), "gear");
    }
}
