use std::fmt::{self, Display};

use thiserror::Error;

/// 优化器错误
///
/// 致命错误才会出现在这里；构造期的非致命提示见[`Advisory`]。
#[derive(Error, Debug, PartialEq)]
pub enum OptimizerError {
    // 构造期校验：衰减系数必须位于(0, 1]区间
    #[error("{name}必须位于(0, 1]区间内，实际为{value}")]
    InvalidDecay { name: &'static str, value: f64 },

    // 梯度闭包的失败原样向上传播，不重试
    #[error("梯度计算失败：{0}")]
    Gradient(#[from] GradientError),

    // 恢复检查点时向量长度与参数向量不一致
    #[error("检查点与参数向量不兼容：期望长度为{expected}，实际为{actual}")]
    IncompatibleState { expected: usize, actual: usize },
}

/// 梯度闭包返回的失败
///
/// 优化器不关心失败的具体原因，只负责把它原样交还给驱动方，
/// 且保证失败的这一步不会推进任何内部状态。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct GradientError(pub String);

impl GradientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 构造期的非致命提示
///
/// 对应climin中通过`warnings.warn`发出的全局警告；这里改为随构造结果
/// 一并返回的显式值，由调用方决定如何呈现。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// 衰减系数组合不满足Adam原论文的收敛性约束（配置仍被接受）
    ConvergenceConstraint,
    /// 传入了早期版本遗留的`decay`参数（已无任何效果）
    DeprecatedDecay,
}

impl Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Advisory::ConvergenceConstraint => {
                "该衰减系数组合不满足Adam收敛性分析的约束条件，请对照原论文确认确实要这样配置"
            }
            Advisory::DeprecatedDecay => "decay参数仅存在于早期版本的Adam中，现已无任何效果",
        };
        write!(f, "{}", message)
    }
}
