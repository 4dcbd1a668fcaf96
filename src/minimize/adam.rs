/*
 * @Author       : 老董
 * @Date         : 2026-08-06
 * @LastEditors  : 老董
 * @LastEditTime : 2026-08-27
 * @Description  : Adam更新规则（含Nesterov动量变体）及其检查点
 */

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::{Minimizer, StepRate, UpdateRule};
use crate::errors::{Advisory, GradientError, OptimizerError};

/// Adam的构造配置
///
/// 默认值沿用climin：`step_rate=2e-4`、`decay_mom1=0.1`、`decay_mom2=0.001`、
/// `offset=1e-8`、`momentum=false`。
///
/// 注意衰减系数的约定与Adam原论文相反：记论文中的系数为β*，
/// 则这里的`decay_momX = 1 - β*`，即"最新观测所占的权重"。
#[derive(Debug, Clone, PartialEq)]
pub struct AdamConfig {
    /// 步长率，标量或逐参数数组
    pub step_rate: StepRate,
    /// 一阶矩估计的指数衰减系数，须位于(0, 1]
    pub decay_mom1: f64,
    /// 二阶矩估计的指数衰减系数，须位于(0, 1]
    pub decay_mom2: f64,
    /// 为false时使用标准Adam，为true时使用Nesterov动量变体（Nadam）
    pub momentum: bool,
    /// 开方后加到二阶矩估计上的安全偏移，防止除零
    pub offset: f64,
    /// 早期版本遗留参数，已无任何效果；传入会触发[`Advisory::DeprecatedDecay`]
    pub decay: Option<f64>,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            step_rate: StepRate::Scalar(2e-4),
            decay_mom1: 0.1,
            decay_mom2: 0.001,
            momentum: false,
            offset: 1e-8,
            decay: None,
        }
    }
}

impl AdamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_rate(mut self, rate: impl Into<StepRate>) -> Self {
        self.step_rate = rate.into();
        self
    }

    pub fn decay_mom1(mut self, decay: f64) -> Self {
        self.decay_mom1 = decay;
        self
    }

    pub fn decay_mom2(mut self, decay: f64) -> Self {
        self.decay_mom2 = decay;
        self
    }

    pub fn momentum(mut self, momentum: bool) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = Some(decay);
        self
    }
}

/// Adam更新规则
///
/// 自适应矩估计（Adaptive Moment Estimation）：用指数衰减的滑动平均
/// 估计梯度的一阶矩和二阶矩，并对零初始化带来的偏差做修正：
///
/// - m = d1·g + (1-d1)·m
/// - v = d2·g² + (1-d2)·v
/// - 标准模式：α_t = α·√(1-(1-d2)^t) / (1-(1-d1)^t)，step = α_t·m / (√v + ε)
/// - Nesterov模式（[nadam2015]）：
///   m̂ = (1-d1)·m / (1-(1-d1)^(t+1)) + d1·g / (1-(1-d1)^t)，
///   v̂ = v / (1-(1-d2)^t)，step = α·m̂ / (√v̂ + ε)
///
/// 两种模式下ε都加在开方之后，只防除零（二阶矩估计恒非负，根号下无需保护）。
///
/// [nadam2015]: Dozat, "Incorporating Nesterov Momentum into Adam", 2015
#[derive(Debug)]
pub struct Adam {
    step_rate: StepRate,
    decay_mom1: f64,
    decay_mom2: f64,
    momentum: bool,
    offset: f64,
    /// 一阶矩的有偏估计（首个梯度到来时才分配长度）
    est_mom1_b: Array1<f64>,
    /// 二阶矩的有偏估计
    est_mom2_b: Array1<f64>,
    /// (1 - decay_mom1)^t 的累积值
    decay_mom1_pow: f64,
    /// (1 - decay_mom2)^t 的累积值
    decay_mom2_pow: f64,
}

impl Adam {
    /// 使用默认配置创建Adam
    ///
    /// 默认配置必定通过校验且不产生任何提示，故不返回`Result`。
    pub fn new() -> Self {
        Self::from_config(AdamConfig::default())
    }

    /// 使用指定配置创建Adam
    ///
    /// # 返回
    /// 校验通过时返回规则本身和构造期产生的非致命提示（可能为空）：
    /// - 衰减系数组合不满足收敛性约束时附带[`Advisory::ConvergenceConstraint`]；
    /// - 传入遗留的`decay`参数时附带[`Advisory::DeprecatedDecay`]。
    ///
    /// # 错误
    /// 任一衰减系数不在(0, 1]区间内时返回[`OptimizerError::InvalidDecay`]，
    /// 此时不构造任何对象。
    pub fn with_config(config: AdamConfig) -> Result<(Self, Vec<Advisory>), OptimizerError> {
        if !(config.decay_mom1 > 0.0 && config.decay_mom1 <= 1.0) {
            return Err(OptimizerError::InvalidDecay {
                name: "decay_mom1",
                value: config.decay_mom1,
            });
        }
        if !(config.decay_mom2 > 0.0 && config.decay_mom2 <= 1.0) {
            return Err(OptimizerError::InvalidDecay {
                name: "decay_mom2",
                value: config.decay_mom2,
            });
        }

        let mut advisories = Vec::new();
        // 收敛性约束来自Adam原论文的分析，换算到本crate的系数约定后即此式
        if (1.0 - 2.0 * config.decay_mom1) / (1.0 - config.decay_mom2).sqrt() >= 1.0 {
            advisories.push(Advisory::ConvergenceConstraint);
        }
        if config.decay.is_some() {
            advisories.push(Advisory::DeprecatedDecay);
        }

        Ok((Self::from_config(config), advisories))
    }

    fn from_config(config: AdamConfig) -> Self {
        Self {
            step_rate: config.step_rate,
            decay_mom1: config.decay_mom1,
            decay_mom2: config.decay_mom2,
            momentum: config.momentum,
            offset: config.offset,
            est_mom1_b: Array1::zeros(0),
            est_mom2_b: Array1::zeros(0),
            decay_mom1_pow: 1.0,
            decay_mom2_pow: 1.0,
        }
    }

    /// 获取步长率
    pub fn step_rate(&self) -> &StepRate {
        &self.step_rate
    }

    /// 设置步长率（用于外部调度策略在迭代间调整步长）
    pub fn set_step_rate(&mut self, rate: impl Into<StepRate>) {
        self.step_rate = rate.into();
    }

    /// 一阶矩的有偏估计（用于调试和可视化优化过程）
    pub fn est_mom1_b(&self) -> &Array1<f64> {
        &self.est_mom1_b
    }

    /// 二阶矩的有偏估计（用于调试和可视化优化过程）
    pub fn est_mom2_b(&self) -> &Array1<f64> {
        &self.est_mom2_b
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateRule for Adam {
    fn compute_step(&mut self, gradient: &Array1<f64>) -> Array1<f64> {
        // climin以标量0起步靠numpy广播补形状；ndarray没有这种提升，
        // 故矩估计推迟到首个梯度到来时按其长度分配
        if self.est_mom1_b.is_empty() {
            self.est_mom1_b = Array1::zeros(gradient.len());
            self.est_mom2_b = Array1::zeros(gradient.len());
        }

        let dm1 = self.decay_mom1;
        let dm2 = self.decay_mom2;
        let o = self.offset;

        self.decay_mom1_pow *= 1.0 - dm1;
        self.decay_mom2_pow *= 1.0 - dm2;

        self.est_mom1_b = gradient * dm1 + &self.est_mom1_b * (1.0 - dm1);
        self.est_mom2_b = (gradient * gradient) * dm2 + &self.est_mom2_b * (1.0 - dm2);

        if !self.momentum {
            // 原论文建议的高效形式：把两个偏差修正折进步长率
            let rate_t =
                (1.0 - self.decay_mom2_pow).sqrt() / (1.0 - self.decay_mom1_pow);
            let denom = self.est_mom2_b.mapv(f64::sqrt) + o;
            self.step_rate.scale(&self.est_mom1_b / &denom * rate_t)
        } else {
            // Nesterov动量：一阶矩取"前瞻"估计，此时pow1已是(1-d1)^t，
            // 故m的分母为1-(1-d1)^(t+1)
            let est_mom1 = &self.est_mom1_b
                * ((1.0 - dm1) / (1.0 - (1.0 - dm1) * self.decay_mom1_pow))
                + gradient * (dm1 / (1.0 - self.decay_mom1_pow));
            let est_mom2 = &self.est_mom2_b / (1.0 - self.decay_mom2_pow);
            let denom = est_mom2.mapv(f64::sqrt) + o;
            self.step_rate.scale(est_mom1 / &denom)
        }
    }
}

/// Adam的检查点
///
/// 恰好十个字段，整体捕获、整体恢复，保证暂停后的继续运行与不间断运行
/// 轨迹一致（前提是参数源从断点起产出相同的批次序列）。
///
/// 不变式：`decay_mom1_pow == (1 - decay_mom1)^n_iter`，
/// `decay_mom2_pow == (1 - decay_mom2)^n_iter`；两个累积幂必须与计数
/// 一起恢复，单独恢复任何一个都会破坏偏差修正。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub n_iter: usize,
    pub step_rate: StepRate,
    pub decay_mom1: f64,
    pub decay_mom2: f64,
    /// 最近一次应用的步长向量
    pub step: Array1<f64>,
    pub offset: f64,
    pub est_mom1_b: Array1<f64>,
    pub est_mom2_b: Array1<f64>,
    pub decay_mom1_pow: f64,
    pub decay_mom2_pow: f64,
}

impl<'w, F, A> Minimizer<'w, Adam, F, A>
where
    A: Iterator,
    F: FnMut(&Array1<f64>, &A::Item) -> Result<Array1<f64>, GradientError>,
{
    /// 提取检查点
    ///
    /// 不包含参数向量本身：参数向量由调用方持有，应与检查点一起保存。
    pub fn extract_state(&self) -> AdamState {
        AdamState {
            n_iter: self.n_iter,
            step_rate: self.rule.step_rate.clone(),
            decay_mom1: self.rule.decay_mom1,
            decay_mom2: self.rule.decay_mom2,
            step: self.step.clone(),
            offset: self.rule.offset,
            est_mom1_b: self.rule.est_mom1_b.clone(),
            est_mom2_b: self.rule.est_mom2_b.clone(),
            decay_mom1_pow: self.rule.decay_mom1_pow,
            decay_mom2_pow: self.rule.decay_mom2_pow,
        }
    }

    /// 恢复检查点
    ///
    /// 覆盖检查点涵盖的全部字段，不触碰参数向量和梯度闭包。
    ///
    /// # 错误
    /// 检查点中的向量长度与当前参数向量不一致时返回
    /// [`OptimizerError::IncompatibleState`]，此时不修改任何状态。
    pub fn restore_state(&mut self, state: AdamState) -> Result<(), OptimizerError> {
        let expected = self.wrt.len();
        if state.step.len() != expected {
            return Err(OptimizerError::IncompatibleState {
                expected,
                actual: state.step.len(),
            });
        }
        // 矩估计在首步之前长度为0，其余时刻必须与参数向量等长
        for moments in [&state.est_mom1_b, &state.est_mom2_b] {
            if !moments.is_empty() && moments.len() != expected {
                return Err(OptimizerError::IncompatibleState {
                    expected,
                    actual: moments.len(),
                });
            }
        }
        // 逐参数步长率同样必须与参数向量等长
        if let StepRate::PerParameter(rates) = &state.step_rate {
            if rates.len() != expected {
                return Err(OptimizerError::IncompatibleState {
                    expected,
                    actual: rates.len(),
                });
            }
        }

        self.n_iter = state.n_iter;
        self.step = state.step;
        self.rule.step_rate = state.step_rate;
        self.rule.decay_mom1 = state.decay_mom1;
        self.rule.decay_mom2 = state.decay_mom2;
        self.rule.offset = state.offset;
        self.rule.est_mom1_b = state.est_mom1_b;
        self.rule.est_mom2_b = state.est_mom2_b;
        self.rule.decay_mom1_pow = state.decay_mom1_pow;
        self.rule.decay_mom2_pow = state.decay_mom2_pow;
        Ok(())
    }
}
