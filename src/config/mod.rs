mod r#impl;
mod structs;

pub use r#impl::{get_config, init_config, init_config_from};
pub use structs::*;

/// ts-rs 导出目录（前端类型定义）
pub const TS_EXPORT_PATH: &str = "../frontend/src/services/types.generated.ts";
