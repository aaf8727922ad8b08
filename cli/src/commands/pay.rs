//! `pay` against a scripted network
//!
//! Runs the real `pay` handler with the scenario standing in for the route
//! source, the payment sender and the invoice decoder.

use crate::scenario::{Scenario, ScriptedNetwork};
use anyhow::Result;
use clap::Args;
use colored::*;
use lnpay_core::lightning::{Collaborators, PaymentService};
use lnpay_core::rpc::{JsonRpcResponse, PayCommand};
use lnpay_core::LnPayConfig;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments for `pay`
#[derive(Debug, Args)]
pub struct PayArgs {
    /// Scenario file describing the invoice and the network's replies
    #[arg(long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Amount in millisatoshi, for invoices without one
    #[arg(long)]
    pub msatoshi: Option<u64>,

    /// Route riskfactor (defaults to pay.default_riskfactor)
    #[arg(long)]
    pub riskfactor: Option<f64>,

    /// Fee ceiling in percent (defaults to pay.default_maxfeepercent)
    #[arg(long)]
    pub maxfeepercent: Option<f64>,

    /// Description the invoice commits to, if any
    #[arg(long)]
    pub description: Option<String>,
}

impl PayArgs {
    /// JSON-RPC params for the `pay` call
    fn params(&self, scenario: &Scenario) -> Value {
        let mut params = Map::new();
        params.insert("bolt11".into(), json!(scenario.invoice.bolt11));
        if let Some(msatoshi) = self.msatoshi {
            params.insert("msatoshi".into(), json!(msatoshi));
        }
        let description = self
            .description
            .as_ref()
            .or(scenario.invoice.description.as_ref());
        if let Some(description) = description {
            params.insert("description".into(), json!(description));
        }
        if let Some(riskfactor) = self.riskfactor {
            params.insert("riskfactor".into(), json!(riskfactor));
        }
        if let Some(maxfeepercent) = self.maxfeepercent {
            params.insert("maxfeepercent".into(), json!(maxfeepercent));
        }
        Value::Object(params)
    }
}

/// Play the scenario through `pay` and return the JSON-RPC response
pub async fn execute(args: &PayArgs, config: &LnPayConfig) -> Result<JsonRpcResponse> {
    let scenario = Scenario::load(&args.scenario)?;
    run(&scenario, args, config).await
}

pub async fn run(scenario: &Scenario, args: &PayArgs, config: &LnPayConfig) -> Result<JsonRpcResponse> {
    let clock = scenario.clock();
    let network = Arc::new(ScriptedNetwork::new(scenario, clock.as_ref()));

    info!(
        "Scenario loaded: {} route replies, {} send outcomes",
        network.remaining_routes(),
        network.remaining_outcomes()
    );

    let ctx = Collaborators::new(scenario.node_id, network.clone(), network.clone()).with_clock(clock);
    let service = PaymentService::new(ctx).with_retry_delay(config.pay.blockheight_retry_delay());
    let command = PayCommand::new(network.clone(), service, config.pay.clone());

    let response = command.handle(json!(1), args.params(scenario)).await;

    if network.remaining_routes() > 0 || network.remaining_outcomes() > 0 {
        info!(
            "Scenario left unused: {} route replies, {} send outcomes",
            network.remaining_routes(),
            network.remaining_outcomes()
        );
    }
    Ok(response)
}

/// One-line summary for the terminal
pub fn summary(response: &JsonRpcResponse) -> String {
    match &response.error {
        None => format!("{} Payment succeeded", "✓".green().bold()),
        Some(error) => format!(
            "{} Payment failed ({}): {}",
            "✗".red().bold(),
            error.code,
            error.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnpay_core::lightning::PaymentPreimage;

    const NODE_A: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const NODE_B: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn args() -> PayArgs {
        PayArgs {
            scenario: PathBuf::from("unused.toml"),
            msatoshi: None,
            riskfactor: None,
            maxfeepercent: None,
            description: None,
        }
    }

    fn scenario(msatoshi: Option<u64>, routes: &[u64]) -> Scenario {
        let preimage = PaymentPreimage::new([9; 32]);
        let mut text = format!(
            "node_id = \"{}\"\nnow = 1700000000\n\n[invoice]\nbolt11 = \"lnbc1cli\"\npayment_hash = \"{}\"\nreceiver_id = \"{}\"\n",
            NODE_A,
            preimage.payment_hash().to_hex(),
            NODE_B
        );
        if let Some(msatoshi) = msatoshi {
            text.push_str(&format!("msatoshi = {}\n", msatoshi));
        }
        for amount in routes {
            text.push_str(&format!(
                "\n[[routes]]\nhops = [{{ channel_id = \"1x1x0\", node_id = \"{}\", amount_msat = {}, delay = 9 }}]\n",
                NODE_B, amount
            ));
        }
        text.push_str(&format!(
            "\n[[outcomes]]\noutcome = \"success\"\npreimage = \"{}\"\n",
            preimage.to_hex()
        ));
        Scenario::parse(&text).unwrap()
    }

    #[tokio::test]
    async fn test_scenario_pays_after_fee_backoff() {
        let scenario = scenario(Some(100_000), &[101_200, 100_300]);
        let response = run(&scenario, &args(), &LnPayConfig::default())
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["getroute_tries"], json!(2));
        assert_eq!(result["sendpay_tries"], json!(1));
        assert_eq!(result["payment_preimage"], json!("09".repeat(32)));
    }

    #[tokio::test]
    async fn test_cli_amount_and_fee_overrides() {
        let scenario = scenario(None, &[51_000]);
        let args = PayArgs {
            msatoshi: Some(50_000),
            maxfeepercent: Some(2.0),
            ..args()
        };
        let response = run(&scenario, &args, &LnPayConfig::default())
            .await
            .unwrap();
        assert!(response.error.is_none(), "{:?}", response.error);
        assert!(summary(&response).contains("Payment succeeded"));
    }

    #[tokio::test]
    async fn test_no_routes_reports_route_not_found() {
        let scenario = scenario(Some(100_000), &[]);
        let response = run(&scenario, &args(), &LnPayConfig::default())
            .await
            .unwrap();

        let error = response.error.clone().unwrap();
        assert_eq!(error.code, 205);
        assert_eq!(error.data.unwrap()["getroute_tries"], json!(1));
        assert!(summary(&response).contains("(205): Could not find a route"));
    }

    #[test]
    fn test_params_include_overrides_only() {
        let scenario = scenario(Some(100_000), &[]);
        assert_eq!(args().params(&scenario), json!({"bolt11": "lnbc1cli"}));

        let with_risk = PayArgs {
            riskfactor: Some(3.0),
            description: Some("coffee".to_string()),
            ..args()
        };
        assert_eq!(
            with_risk.params(&scenario),
            json!({"bolt11": "lnbc1cli", "riskfactor": 3.0, "description": "coffee"})
        );
    }
}
