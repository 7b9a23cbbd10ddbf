use proc_macro::TokenStream;

mod publisher;
mod subscriber;
mod utils;

/// 发布者宏
/// - 仅支持具名字段结构体
/// - 每个类型为 `Event<T>` 的字段生成一个事件描述，事件名即字段名
/// - 自动实现 `::evwire_core::Publisher`
///
/// ```ignore
/// #[publisher]
/// #[derive(Default)]
/// struct AccountManager {
///     user_created: Event<UserCreated>,
/// }
/// ```
#[proc_macro_attribute]
pub fn publisher(attr: TokenStream, item: TokenStream) -> TokenStream {
    publisher::expand(attr, item)
}

/// 订阅者宏（用于固有 impl 块）
/// - 标记了 `#[handles_event]` 的方法成为处理方法
/// - 处理方法形如 `fn m(&self, e: &T)` 或 `fn m(&self, e: T)`，返回 `()` 或 `Result<(), E>`
/// - 形状不符的标记方法默认被排除；`#[subscriber(strict)]` 时报编译错误
/// - 自动实现 `::evwire_core::Subscriber`
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscriber::expand(attr, item)
}

/// 处理方法标记
///
/// 在 `#[subscriber]` impl 块内由 `#[subscriber]` 消费；单独使用时不做任何处理。
#[proc_macro_attribute]
pub fn handles_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[handles_event] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    item
}
