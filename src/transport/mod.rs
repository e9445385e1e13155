// 传输层：把操作发送给服务器并取回原始响应
mod ssh;

pub use ssh::SshCliTransport;

use crate::error::WildflyError;
use crate::operations::Operation;
use serde_json::Value;
use std::time::Duration;

/// 到管理接口的原始连接。
///
/// 即使操作在服务器上失败，`submit` 也返回服务器响应（`outcome`、`result`、
/// `failure-description` 等）；`Err` 表示请求没有得到响应。
pub trait Transport: Send {
    fn submit(&mut self, operation: &Operation) -> Result<Value, WildflyError>;

    /// 尝试一次重新建立连接。调用方负责轮询，单次尝试不能超过 `budget`。
    fn reconnect(&mut self, budget: Duration) -> Result<(), WildflyError>;

    fn close(&mut self) -> Result<(), WildflyError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn submit(&mut self, operation: &Operation) -> Result<Value, WildflyError> {
        (**self).submit(operation)
    }

    fn reconnect(&mut self, budget: Duration) -> Result<(), WildflyError> {
        (**self).reconnect(budget)
    }

    fn close(&mut self) -> Result<(), WildflyError> {
        (**self).close()
    }
}
