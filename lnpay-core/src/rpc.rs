//! JSON-RPC surface for the `pay` command
//!
//! Request/response shapes follow JSON-RPC 2.0. The `pay` result and error
//! payloads are described in `lightning::report`.

use crate::config::PayConfig;
use crate::error::PayRequestError;
use crate::lightning::attempt::PaymentTerms;
use crate::lightning::invoice::InvoiceDecoder;
use crate::lightning::orchestrator::{PaymentService, PendingPayment};
use crate::lightning::report::{PayFailure, PayResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// The engine takes riskfactor in thousandths
const RISKFACTOR_SCALE: f64 = 1000.0;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }

    /// Response for a terminal payment result
    pub fn from_pay_result(id: Value, result: &PayResult) -> Self {
        match result {
            Ok(success) => match serde_json::to_value(success) {
                Ok(value) => Self::result(id, value),
                Err(e) => Self::error(id, -32603, format!("Internal error: {}", e), None),
            },
            Err(failure) => Self::error(id, failure.code(), failure.message(), failure.data()),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Parameters of `pay`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayParams {
    pub bolt11: String,
    #[serde(default)]
    pub msatoshi: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub riskfactor: Option<f64>,
    #[serde(default)]
    pub maxfeepercent: Option<f64>,
}

impl PayParams {
    const POSITIONAL: [&'static str; 5] =
        ["bolt11", "msatoshi", "description", "riskfactor", "maxfeepercent"];

    /// Accepts named (object) or positional (array) params. Numbers may also
    /// be given as strings.
    pub fn from_value(params: Value) -> Result<Self, PayRequestError> {
        let mut named = match params {
            Value::Array(values) => {
                if values.len() > Self::POSITIONAL.len() {
                    return Err(PayRequestError::InvalidParams(format!(
                        "too many parameters: got {}, expected at most {}",
                        values.len(),
                        Self::POSITIONAL.len()
                    )));
                }
                let map = Self::POSITIONAL
                    .iter()
                    .zip(values)
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value)| (name.to_string(), value))
                    .collect();
                Value::Object(map)
            }
            other => other,
        };

        if let Value::Object(map) = &mut named {
            if let Some(value) = map.get_mut("msatoshi").filter(|v| !v.is_null()) {
                let amount = amount_token(value)
                    .ok_or_else(|| PayRequestError::InvalidAmount(token_text(value)))?;
                *value = Value::from(amount);
            }
            for field in ["riskfactor", "maxfeepercent"] {
                if let Some(value) = map.get_mut(field).filter(|v| !v.is_null()) {
                    let double = match &*value {
                        Value::String(s) => s.trim().parse::<f64>().ok(),
                        other => other.as_f64(),
                    }
                    .ok_or_else(|| PayRequestError::InvalidDouble(token_text(value)))?;
                    // serde_json has no representation for NaN or infinity
                    if double.is_finite() {
                        *value = Value::from(double);
                    } else {
                        return Err(PayRequestError::InvalidDouble(token_text(value)));
                    }
                }
            }
        }

        serde_json::from_value(named).map_err(|e| PayRequestError::InvalidParams(e.to_string()))
    }
}

/// Unsigned integer behind a JSON number or a numeric string
fn amount_token(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The parameter as the caller wrote it, without string quotes
fn token_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Handler for `pay`: decode, validate, run the payment, report
pub struct PayCommand {
    decoder: Arc<dyn InvoiceDecoder>,
    service: PaymentService,
    defaults: PayConfig,
}

impl PayCommand {
    pub fn new(decoder: Arc<dyn InvoiceDecoder>, service: PaymentService, defaults: PayConfig) -> Self {
        Self {
            decoder,
            service,
            defaults,
        }
    }

    /// Build payment terms from the caller's params
    pub fn terms(&self, params: &PayParams) -> Result<PaymentTerms, PayRequestError> {
        let invoice = self
            .decoder
            .decode(&params.bolt11, params.description.as_deref())?;

        let amount_msat = match (invoice.msatoshi, params.msatoshi) {
            (Some(_), Some(_)) => return Err(PayRequestError::AmountUnnecessary),
            (None, None) => return Err(PayRequestError::AmountRequired),
            (Some(amount), None) | (None, Some(amount)) => amount,
        };

        let riskfactor = params.riskfactor.unwrap_or(self.defaults.default_riskfactor);
        if !riskfactor.is_finite() {
            return Err(PayRequestError::InvalidRiskFactor(riskfactor));
        }

        let terms = PaymentTerms {
            payment_hash: invoice.payment_hash,
            receiver_id: invoice.receiver_id,
            expiry: invoice.absolute_expiry(),
            min_final_cltv: invoice.min_final_cltv_expiry,
            amount_msat,
            riskfactor: riskfactor * RISKFACTOR_SCALE,
            max_fee_percent: params
                .maxfeepercent
                .unwrap_or(self.defaults.default_maxfeepercent),
        };
        terms.validate()?;
        Ok(terms)
    }

    /// Start the payment; immediate failures come back as `Err`
    pub fn start(&self, params: Value) -> Result<PendingPayment, PayFailure> {
        let params = PayParams::from_value(params)?;
        let terms = self.terms(&params)?;
        self.service.initiate_payment(terms)
    }

    /// Run `pay` to completion and build the JSON-RPC response
    pub async fn handle(&self, id: Value, params: Value) -> JsonRpcResponse {
        let result = match self.start(params) {
            Ok(pending) => match pending.wait().await {
                Ok(result) => result,
                Err(e) => {
                    error!("pay: {}", e);
                    return JsonRpcResponse::error(id, -32603, e.to_string(), None);
                }
            },
            Err(failure) => Err(failure),
        };

        if let Err(PayFailure::InvalidRequest(e)) = &result {
            info!("pay: rejected request: {}", e);
        }
        JsonRpcResponse::from_pay_result(id, &result)
    }

    /// Dispatch a full request; only `pay` is served here
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.method != "pay" {
            return JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Unknown command '{}'", request.method),
                None,
            );
        }
        self.handle(request.id, request.params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_params() {
        let params = PayParams::from_value(json!({
            "bolt11": "lnbc1",
            "maxfeepercent": 1.0
        }))
        .unwrap();
        assert_eq!(params.bolt11, "lnbc1");
        assert_eq!(params.maxfeepercent, Some(1.0));
        assert_eq!(params.msatoshi, None);
    }

    #[test]
    fn test_positional_params() {
        let params = PayParams::from_value(json!(["lnbc1", 5000, null, 2.5])).unwrap();
        assert_eq!(params.bolt11, "lnbc1");
        assert_eq!(params.msatoshi, Some(5000));
        assert_eq!(params.description, None);
        assert_eq!(params.riskfactor, Some(2.5));
        assert_eq!(params.maxfeepercent, None);
    }

    #[test]
    fn test_bad_params() {
        assert!(matches!(
            PayParams::from_value(json!({})),
            Err(PayRequestError::InvalidParams(_))
        ));
        assert!(matches!(
            PayParams::from_value(json!(["a", 1, null, 1.0, 0.5, "extra"])),
            Err(PayRequestError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_non_numeric_amount_and_doubles() {
        assert_eq!(
            PayParams::from_value(json!({"bolt11": "x", "msatoshi": "lots"})),
            Err(PayRequestError::InvalidAmount("lots".to_string()))
        );
        assert_eq!(
            PayParams::from_value(json!({"bolt11": "x", "msatoshi": -5})),
            Err(PayRequestError::InvalidAmount("-5".to_string()))
        );
        assert_eq!(
            PayParams::from_value(json!({"bolt11": "x", "msatoshi": 1.5})),
            Err(PayRequestError::InvalidAmount("1.5".to_string()))
        );
        assert_eq!(
            PayParams::from_value(json!({"bolt11": "x", "riskfactor": "high"})),
            Err(PayRequestError::InvalidDouble("high".to_string()))
        );
        assert_eq!(
            PayParams::from_value(json!(["x", null, null, null, [1]])),
            Err(PayRequestError::InvalidDouble("[1]".to_string()))
        );

        let err = PayParams::from_value(json!({"bolt11": "x", "maxfeepercent": "lots"})).unwrap_err();
        assert_eq!(err.to_string(), "'lots' is not a valid double");
        let err = PayParams::from_value(json!({"bolt11": "x", "msatoshi": "lots"})).unwrap_err();
        assert_eq!(err.to_string(), "msatoshi 'lots' is not a valid number");
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let params = PayParams::from_value(json!({
            "bolt11": "x",
            "msatoshi": "5000",
            "riskfactor": "2.5",
            "maxfeepercent": 1
        }))
        .unwrap();
        assert_eq!(params.msatoshi, Some(5000));
        assert_eq!(params.riskfactor, Some(2.5));
        assert_eq!(params.maxfeepercent, Some(1.0));
    }

    #[test]
    fn test_error_response_shape() {
        let response = JsonRpcResponse::error(json!(1), 205, "Could not find a route".into(), None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["jsonrpc"], json!("2.0"));
        assert_eq!(value["error"]["code"], json!(205));
        assert!(value.get("result").is_none());
        assert!(value["error"].get("data").is_none());
    }
}
