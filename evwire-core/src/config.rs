//! 绑定配置
//!
//! 可以用 builder 构造，也可以从 JSON 读取（缺省字段取默认值）：
//!
//! ```
//! use evwire_core::{DispatchMode, WiringConfig};
//!
//! let config = WiringConfig::from_json(r#"{ "mode": "InMemoryQueue" }"#).unwrap();
//! assert_eq!(config.mode, DispatchMode::InMemoryQueue);
//! ```
//!
use crate::error::{BindingResult, EventBindingError};
use crate::eventing::EventBusConfig;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 分发模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// 事件触发时在发布者线程上同步调用处理方法
    #[default]
    #[serde(alias = "Direct")]
    Direct,
    /// 事件转发到进程内总线，由后台消费者调用处理方法
    #[serde(alias = "InMemoryQueue")]
    InMemoryQueue,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::InMemoryQueue => "in_memory_queue",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = EventBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "direct" | "Direct" => Ok(Self::Direct),
            "in_memory_queue" | "InMemoryQueue" => Ok(Self::InMemoryQueue),
            other => Err(EventBindingError::InvalidConfig {
                reason: format!("unknown dispatch mode: {other}"),
            }),
        }
    }
}

/// 同一订阅者处理方法匹配到多个发布者事件时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// 按遍历顺序取第一个
    #[default]
    FirstMatch,
    /// 解析失败，返回 `AmbiguousPublisher`
    Reject,
}

/// 处理方法没有任何匹配事件时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnboundHandlerPolicy {
    #[default]
    Ignore,
    Warn,
    Reject,
}

/// 事件绑定的整体配置
#[derive(Builder, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    #[builder(default)]
    pub mode: DispatchMode,
    #[builder(default)]
    pub ambiguity: AmbiguityPolicy,
    #[builder(default)]
    pub unbound_handlers: UnboundHandlerPolicy,
    #[builder(default)]
    pub bus: EventBusConfig,
}

impl WiringConfig {
    pub fn from_json(json: &str) -> BindingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::ShutdownPolicy;

    #[test]
    fn dispatch_mode_parses_both_spellings() {
        assert_eq!("Direct".parse::<DispatchMode>().unwrap(), DispatchMode::Direct);
        assert_eq!(
            "in_memory_queue".parse::<DispatchMode>().unwrap(),
            DispatchMode::InMemoryQueue
        );
        assert!(matches!(
            "queued".parse::<DispatchMode>(),
            Err(EventBindingError::InvalidConfig { .. })
        ));
        assert_eq!(DispatchMode::InMemoryQueue.to_string(), "in_memory_queue");
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = WiringConfig::from_json("{}").unwrap();
        assert_eq!(config.mode, DispatchMode::Direct);
        assert_eq!(config.ambiguity, AmbiguityPolicy::FirstMatch);
        assert_eq!(config.unbound_handlers, UnboundHandlerPolicy::Ignore);

        let config = WiringConfig::from_json(
            r#"{"mode":"in_memory_queue","ambiguity":"reject","bus":{"shutdown":"abandon"}}"#,
        )
        .unwrap();
        assert_eq!(config.mode, DispatchMode::InMemoryQueue);
        assert_eq!(config.ambiguity, AmbiguityPolicy::Reject);
        assert_eq!(config.bus.shutdown, ShutdownPolicy::Abandon);
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        assert!(matches!(
            WiringConfig::from_json("{ nope"),
            Err(EventBindingError::Serde { .. })
        ));
    }

    #[test]
    fn builder_defaults_match_default() {
        let built = WiringConfig::builder()
            .mode(DispatchMode::InMemoryQueue)
            .build();
        assert_eq!(built.mode, DispatchMode::InMemoryQueue);
        assert_eq!(built.ambiguity, WiringConfig::default().ambiguity);
    }
}
