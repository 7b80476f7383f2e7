use alloy_primitives::{Address, Bytes, hex};
use async_trait::async_trait;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Block a read is pinned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockTag {
    Number(u64),
    Latest,
}

impl BlockTag {
    pub fn number(&self) -> Option<u64> {
        match self {
            BlockTag::Number(number) => Some(*number),
            BlockTag::Latest => None,
        }
    }

    fn to_rpc_param(self) -> String {
        match self {
            BlockTag::Number(number) => format!("0x{:x}", number),
            BlockTag::Latest => "latest".to_string(),
        }
    }
}

impl Display for BlockTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockTag::Number(number) => write!(f, "{}", number),
            BlockTag::Latest => write!(f, "latest"),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        BlockTag::Number(number)
    }
}

/// Single read-only contract call. Timeouts are the implementor's concern and
/// surface as errors.
#[async_trait]
pub trait RemoteReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes>;
}

/// `eth_call` over JSON-RPC HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    rpc_url: String,
}

impl HttpTransport {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self { http_client, rpc_url })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl RemoteReader for HttpTransport {
    async fn call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{:#x}", to),
                    "data": format!("{:#x}", data)
                },
                block.to_rpc_param()
            ],
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let response_json: Value = response.json().await?;
        decode_rpc_result(&response_json)
    }
}

fn decode_rpc_result(response_json: &Value) -> Result<Bytes> {
    if let Some(error) = response_json.get("error") {
        return Err(eyre!("RPC error: {}", error));
    }

    let result = response_json
        .get("result")
        .and_then(|r| r.as_str())
        .ok_or_else(|| eyre!("Missing result in RPC response"))?;

    let bytes = hex::decode(result.trim_start_matches("0x"))?;
    Ok(bytes.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_rpc_param() {
        assert_eq!(BlockTag::Number(255).to_rpc_param(), "0xff");
        assert_eq!(BlockTag::Latest.to_rpc_param(), "latest");
        assert_eq!(BlockTag::from(7).number(), Some(7));
        assert_eq!(BlockTag::Latest.number(), None);
    }

    #[test]
    fn test_decode_rpc_result() {
        let ok = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": "0x0102"});
        assert_eq!(decode_rpc_result(&ok).unwrap(), Bytes::from(vec![1u8, 2u8]));

        let reverted = serde_json::json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 3, "message": "execution reverted"}});
        assert!(decode_rpc_result(&reverted).is_err());

        let empty = serde_json::json!({"jsonrpc": "2.0", "id": 1});
        assert!(decode_rpc_result(&empty).is_err());
    }

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new("https://rpc.example.org".to_string(), Duration::from_secs(10)).unwrap();
        assert_eq!(transport.rpc_url(), "https://rpc.example.org");
    }
}
