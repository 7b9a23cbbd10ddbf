//! 作用域层错误定义，装配错误经 `#[from]` 包装

use evwire_core::EventBindingError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("binding: {0}")]
    Binding(#[from] EventBindingError),

    #[error("instance not found: role={role}, type={type_name}")]
    InstanceNotFound {
        role: &'static str,
        type_name: &'static str,
    },

    #[error("instance already registered: type={type_name}")]
    AlreadyRegistered { type_name: &'static str },
}

pub type ScopeResult<T> = Result<T, ScopeError>;
