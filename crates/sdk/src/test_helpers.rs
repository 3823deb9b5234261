//! テスト用ヘルパー: サンプル資産とモックJSON-RPCサーバー

use std::sync::Arc;

use axum::Json;
use base64::Engine;
use rwa_types::AssetType;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;

use crate::state::AssetAccount;

/// テスト用の資産アカウント（1トークン = 1.5 USDC、発行上限100万トークン）
pub(crate) fn sample_asset(owner: Pubkey) -> AssetAccount {
    AssetAccount {
        owner,
        name: "Tokyo Office".to_string(),
        description: "Grade A office building in Marunouchi".to_string(),
        valuation: 1_500_000 * 1_000_000,
        asset_type: AssetType::RealEstate,
        metadata_uri: "https://arweave.net/abc123".to_string(),
        total_supply: 1_000_000 * 1_000_000,
        minted_supply: 0,
        created_at: 1_700_000_000,
        last_mint_at: 0,
        last_redeem_at: 0,
        is_active: true,
        bump: 254,
        mint_bump: 253,
    }
}

pub(crate) fn rpc_result(result: Value) -> Value {
    json!({ "result": result })
}

pub(crate) fn rpc_error(code: i64, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

/// `{context, value}` 形式で包む
pub(crate) fn context(value: Value) -> Value {
    json!({ "context": { "slot": 1 }, "value": value })
}

/// getAccountInfo形式のアカウントJSON
pub(crate) fn account_json(owner: &Pubkey, data: &[u8]) -> Value {
    json!({
        "lamports": 1_000_000,
        "owner": owner.to_string(),
        "data": [base64::engine::general_purpose::STANDARD.encode(data), "base64"],
        "executable": false,
        "rentEpoch": 0,
        "space": data.len()
    })
}

/// ルーターをローカルポートで起動し、ベースURLを返す。
pub(crate) async fn spawn_router(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// モックJSON-RPCサーバーを起動する。
///
/// `handler(method, params)` は `rpc_result` / `rpc_error` の値を返す。
/// `jsonrpc` と `id` はサーバー側で付与する。
pub(crate) async fn spawn_rpc_server<F>(handler: F) -> String
where
    F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let router = axum::Router::new().route(
        "/",
        axum::routing::post(move |Json(body): Json<Value>| {
            let handler = handler.clone();
            async move {
                let method = body["method"].as_str().unwrap_or_default().to_string();
                let params = body.get("params").cloned().unwrap_or(Value::Null);
                let mut response = handler(&method, &params);
                response["jsonrpc"] = json!("2.0");
                response["id"] = body.get("id").cloned().unwrap_or(json!(1));
                Json(response)
            }
        }),
    );
    spawn_router(router).await
}
