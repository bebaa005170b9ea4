//! Generation Adapter - 生成服务客户端实现

mod fake_generation_client;
mod openai_client;

pub use fake_generation_client::FakeGenerationClient;
pub use openai_client::*;
