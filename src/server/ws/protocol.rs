use serde::Deserialize;

pub const WS_APP_PROTOCOL: &str = "creditrust.v1";

#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub question: Option<String>,
    pub product: Option<String>,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
}
