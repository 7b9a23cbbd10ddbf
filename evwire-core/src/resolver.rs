//! 绑定解析（BindingResolver）
//!
//! 对目录中每个订阅者的每个处理方法，按遍历顺序在全部发布者的事件中查找
//! 载荷类型完全相同的事件（名义类型相等，不做协变或转换）：
//! - 没有匹配：按 [`UnboundHandlerPolicy`] 忽略、告警或报错；
//! - 多个发布者匹配：按 [`AmbiguityPolicy`] 取第一个或报错；
//! - 同一发布者内取声明顺序的第一个事件。
//!
//! 结果按（发布者, 订阅者）分组成 [`Binding`]，顺序为各组首条路由被发现的顺序。
//!
use crate::binding::{Binding, BindingSet, EventRoute};
use crate::catalog::TypeCatalog;
use crate::config::{AmbiguityPolicy, DispatchMode, UnboundHandlerPolicy, WiringConfig};
use crate::descriptor::TypeKey;
use crate::error::{BindingResult, EventBindingError};
use bon::Builder;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Builder, Clone, Copy, Debug, Default)]
pub struct BindingResolver {
    #[builder(default)]
    mode: DispatchMode,
    #[builder(default)]
    ambiguity: AmbiguityPolicy,
    #[builder(default)]
    unbound_handlers: UnboundHandlerPolicy,
}

impl BindingResolver {
    pub fn from_config(config: &WiringConfig) -> Self {
        Self {
            mode: config.mode,
            ambiguity: config.ambiguity,
            unbound_handlers: config.unbound_handlers,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn resolve(&self, catalog: &TypeCatalog) -> BindingResult<BindingSet> {
        let publishers = catalog.publishers();

        let mut groups: Vec<(TypeKey, TypeKey, Vec<EventRoute>)> = Vec::new();
        let mut index: HashMap<(TypeKey, TypeKey), usize> = HashMap::new();
        let mut unbound = 0usize;

        for subscriber in catalog.subscribers() {
            for handler in subscriber.handlers() {
                let payload = handler.payload();
                let candidates: Vec<_> = publishers
                    .iter()
                    .filter_map(|p| p.event_for(payload).map(|e| (p.ty(), e)))
                    .collect();

                let Some((publisher, event)) = candidates.first() else {
                    unbound += 1;
                    match self.unbound_handlers {
                        UnboundHandlerPolicy::Ignore => {}
                        UnboundHandlerPolicy::Warn => {
                            warn!(
                                subscriber = subscriber.ty().name(),
                                method = handler.method(),
                                payload = payload.name(),
                                "event handler has no matching publisher"
                            );
                        }
                        UnboundHandlerPolicy::Reject => {
                            return Err(EventBindingError::UnboundHandler {
                                subscriber: subscriber.ty().name(),
                                method: handler.method(),
                                payload: payload.name(),
                            });
                        }
                    }
                    continue;
                };

                if candidates.len() > 1 {
                    let names: Vec<&'static str> =
                        candidates.iter().map(|(p, _)| p.name()).collect();
                    match self.ambiguity {
                        AmbiguityPolicy::FirstMatch => {
                            debug!(
                                handler = %handler.label(),
                                payload = payload.name(),
                                candidates = ?names,
                                chosen = publisher.name(),
                                "ambiguous publisher, first match wins"
                            );
                        }
                        AmbiguityPolicy::Reject => {
                            return Err(EventBindingError::AmbiguousPublisher {
                                payload: payload.name(),
                                candidates: names,
                            });
                        }
                    }
                }

                let route = EventRoute::new((*event).clone(), handler.clone());
                let key = (*publisher, subscriber.ty());
                match index.get(&key) {
                    Some(&i) => groups[i].2.push(route),
                    None => {
                        index.insert(key, groups.len());
                        groups.push((key.0, key.1, vec![route]));
                    }
                }
            }
        }

        let bindings: Vec<Binding> = groups
            .into_iter()
            .map(|(publisher, subscriber, routes)| {
                Binding::new(publisher, subscriber, self.mode, routes)
            })
            .collect();
        let set = BindingSet::new(bindings);

        debug!(
            bindings = set.len(),
            routes = set.route_count(),
            unbound,
            mode = %self.mode,
            "event bindings resolved"
        );
        Ok(set)
    }
}
