// WebAssembly bindings for a single quantity field
use crate::codec::DbValue;
use crate::config::ConfigFile;
use crate::convert::RawInput;
use crate::field::QuantityField;
use crate::query::{ColumnRef, LookupRhs};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct QuantityFieldWasm {
    field: QuantityField,
}

#[wasm_bindgen]
impl QuantityFieldWasm {
    /// Build a field from TOML config contents; the [field] section is required.
    #[wasm_bindgen(constructor)]
    pub fn new(config_content: &str) -> Result<QuantityFieldWasm, JsValue> {
        let file = ConfigFile::load_from_str(config_content)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?;
        let spec = file
            .field
            .ok_or_else(|| JsValue::from_str("Config has no [field] section"))?;
        let context = file
            .settings
            .build_context()
            .map_err(|e| JsValue::from_str(&format!("Failed to build registry: {}", e)))?;
        let field = QuantityField::new(&spec, &context)
            .map_err(|e| JsValue::from_str(&format!("Invalid field: {}", e)))?;

        Ok(Self { field })
    }

    /// Convert and validate a JSON input value.
    /// Returns JSON `{"magnitude", "units"}` or `null`
    #[wasm_bindgen]
    pub fn convert(&self, input_json: &str) -> Result<String, JsValue> {
        let raw = parse_input(input_json)?;
        let quantity = self
            .field
            .clean(&raw)
            .map_err(|e| JsValue::from_str(&format!("Failed to convert: {}", e)))?;

        serde_json::to_string(&quantity)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize quantity: {}", e)))
    }

    /// Encode a JSON input value as composite record text.
    #[wasm_bindgen]
    pub fn encode(&self, input_json: &str) -> Result<Option<String>, JsValue> {
        let raw = parse_input(input_json)?;
        let quantity = self
            .field
            .clean(&raw)
            .map_err(|e| JsValue::from_str(&format!("Failed to convert: {}", e)))?;
        let record = self
            .field
            .encode(quantity.as_ref())
            .map_err(|e| JsValue::from_str(&format!("Failed to encode: {}", e)))?;

        Ok(record.map(|r| r.to_text()))
    }

    /// Decode composite record text into the field's display form.
    #[wasm_bindgen]
    pub fn decode(&self, stored: &str) -> Result<Option<String>, JsValue> {
        let quantity = self
            .field
            .decode(&DbValue::Text(stored.to_string()))
            .map_err(|e| JsValue::from_str(&format!("Failed to decode: {}", e)))?;

        Ok(quantity.map(|q| self.field.display(&q)))
    }

    /// Translate a lookup. `rhs_json` is one operand, or a two-element
    /// array for `range`. Returns JSON `{"sql", "params"}`
    #[wasm_bindgen]
    pub fn lookup(&self, op: &str, column: &str, rhs_json: &str) -> Result<String, JsValue> {
        let value: serde_json::Value = serde_json::from_str(rhs_json)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse operand JSON: {}", e)))?;
        let rhs = match (op, value) {
            ("isnull", serde_json::Value::Bool(flag)) => LookupRhs::Flag(flag),
            ("range", serde_json::Value::Array(mut bounds)) if bounds.len() == 2 => {
                let high = bounds.remove(1);
                let low = bounds.remove(0);
                LookupRhs::range(RawInput::from(low), RawInput::from(high))
            }
            (_, value) => LookupRhs::value(RawInput::from(value)),
        };

        let compiled = self
            .field
            .translate_lookup(op, &ColumnRef::new(column), &rhs)
            .map_err(|e| JsValue::from_str(&format!("Failed to translate lookup: {}", e)))?;

        let json = serde_json::json!({
            "sql": compiled.sql,
            "params": compiled.params,
        });
        Ok(json.to_string())
    }
}

fn parse_input(input_json: &str) -> Result<RawInput, JsValue> {
    let value: serde_json::Value = serde_json::from_str(input_json)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input JSON: {}", e)))?;
    Ok(RawInput::from(value))
}
