//! # Only Optim
//!
//! `only_optim`项目旨在用纯rust实现[climin](https://github.com/BRML/climin)这类
//! 基于梯度的随机优化器核心：一个惰性、拉取驱动、可暂停恢复（checkpoint）的
//! 一阶迭代最小化器。目标函数的梯度由调用方以闭包形式提供，参数向量由调用方
//! 持有并被原地更新；目前提供Adam（含Nesterov动量变体，即Nadam）更新规则。
//!

pub mod errors;
pub mod minimize;
