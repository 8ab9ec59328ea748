/// 请求（命令/查询）
///
/// 请求与响应严格一对一：同一 `(Request, Response)` 组合只允许注册一个处理器。
pub trait Request: Send + 'static {
    /// 请求的稳定名称
    const NAME: &'static str;

    /// 处理器返回的响应类型
    type Response: Send + 'static;
}

/// 流式请求
///
/// 与 [`Request`] 一样只有一个处理器，但响应是一个按需产生、有限且不可重启的序列。
pub trait StreamRequest: Send + 'static {
    /// 流式请求的稳定名称
    const NAME: &'static str;

    /// 序列中每个元素的类型
    type Item: Send + 'static;
}
