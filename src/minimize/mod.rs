/*
 * @Author       : 老董
 * @Date         : 2026-08-05
 * @LastEditors  : 老董
 * @LastEditTime : 2026-08-26
 * @Description  : 迭代最小化器的基础抽象：惰性步进协议 + 更新规则接口
 */

mod adam;

pub use adam::{Adam, AdamConfig, AdamState};

#[cfg(test)]
mod tests;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::errors::{GradientError, OptimizerError};

/// 更新规则（策略接口）
///
/// 最小化器把"拿到一个梯度后该往哪里走多远"完全委托给更新规则；
/// 规则自身持有超参数和逐步演进的矩状态。
///
/// # 事务性约定
/// `compute_step`只会在梯度成功求得之后被调用，因此规则内部状态的
/// 推进与迭代计数的推进要么同时发生、要么都不发生。
pub trait UpdateRule {
    /// 根据本步梯度计算应从参数向量中减去的步长，并推进内部状态
    fn compute_step(&mut self, gradient: &Array1<f64>) -> Array1<f64>;
}

/// 步长率：标量或逐参数数组
///
/// 在步长应用到参数向量之前与之相乘；数组形式按元素广播，
/// 可为不同参数配置不同的步长。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepRate {
    Scalar(f64),
    PerParameter(Array1<f64>),
}

impl StepRate {
    /// 将步长率乘到方向向量上
    pub(crate) fn scale(&self, direction: Array1<f64>) -> Array1<f64> {
        match self {
            StepRate::Scalar(rate) => direction * *rate,
            StepRate::PerParameter(rates) => direction * rates,
        }
    }
}

impl From<f64> for StepRate {
    fn from(rate: f64) -> Self {
        StepRate::Scalar(rate)
    }
}

impl From<Array1<f64>> for StepRate {
    fn from(rates: Array1<f64>) -> Self {
        StepRate::PerParameter(rates)
    }
}

/// 单步诊断报告
///
/// 每完成一步优化产出一份，交给驱动方后最小化器不再保留。
#[derive(Debug, Clone)]
pub struct StepReport<B> {
    /// 迭代计数（从1开始，为完成本步后的值）
    pub n_iter: usize,
    /// 本步求得的原始梯度
    pub gradient: Array1<f64>,
    /// 本步消费的批次描述符
    pub batch: B,
}

/// 迭代最小化器
///
/// 持有调用方参数向量的独占借用，按拉取驱动的方式逐步最小化：
/// 每从迭代器取一个元素，就从参数源取一个批次描述符、求一次梯度、
/// 委托更新规则算出步长并原地更新参数向量，最后产出一份[`StepReport`]。
///
/// 参数源耗尽时序列自然结束；参数源无限时由驱动方决定何时停止拉取。
///
/// # 使用示例
/// ```ignore
/// let mut pars = ndarray::Array1::zeros(2);
/// let (adam, _advisories) = Adam::with_config(AdamConfig::new().step_rate(0.01))?;
/// let mut opt = Minimizer::unbatched(&mut pars, fprime, adam);
/// for report in opt.by_ref().take(100) {
///     let report = report?;
///     println!("第{}步", report.n_iter);
/// }
/// ```
pub struct Minimizer<'w, R, F, A>
where
    A: Iterator,
{
    /// 参数向量（调用方持有，原地更新，绝不重新分配）
    wrt: &'w mut Array1<f64>,
    /// 梯度闭包
    fprime: F,
    /// 更新规则
    rule: R,
    /// 批次描述符来源（可有限可无限）
    args: A,
    /// 迭代计数
    n_iter: usize,
    /// 最近一次应用的步长向量
    step: Array1<f64>,
}

impl<'w, R, F, A> Minimizer<'w, R, F, A>
where
    R: UpdateRule,
    A: Iterator,
    F: FnMut(&Array1<f64>, &A::Item) -> Result<Array1<f64>, GradientError>,
{
    /// 创建最小化器
    ///
    /// # 参数
    /// - `wrt`: 参数向量，优化过程中被原地更新
    /// - `fprime`: 梯度闭包，给定当前参数和批次描述符，返回与参数同形状的搜索方向
    /// - `rule`: 更新规则（超参数校验在规则构造时完成，见[`Adam::with_config`]）
    /// - `args`: 批次描述符的惰性来源，每步消费一个
    pub fn new(wrt: &'w mut Array1<f64>, fprime: F, rule: R, args: A) -> Self {
        let step = Array1::zeros(wrt.len());
        Self {
            wrt,
            fprime,
            rule,
            args,
            n_iter: 0,
            step,
        }
    }

    /// 已完成的迭代步数
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// 最近一次应用到参数向量上的步长（尚未迭代时为全零）
    pub fn last_step(&self) -> &Array1<f64> {
        &self.step
    }

    /// 参数向量的只读视图
    pub fn wrt(&self) -> &Array1<f64> {
        self.wrt
    }

    /// 参数向量的可变视图
    ///
    /// 用于在暂停期间由外部改写参数（如从检查点恢复参数值）
    pub fn wrt_mut(&mut self) -> &mut Array1<f64> {
        self.wrt
    }

    /// 更新规则的只读访问（用于调试和状态查询）
    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<'w, R, F> Minimizer<'w, R, F, std::iter::Repeat<()>>
where
    R: UpdateRule,
    F: FnMut(&Array1<f64>, &()) -> Result<Array1<f64>, GradientError>,
{
    /// 创建无批次参数的最小化器
    ///
    /// 等价于传入一个无限产出空批次的参数源，适用于全量（full batch）场景。
    pub fn unbatched(wrt: &'w mut Array1<f64>, fprime: F, rule: R) -> Self {
        Self::new(wrt, fprime, rule, std::iter::repeat(()))
    }
}

impl<'w, R, F, A> Iterator for Minimizer<'w, R, F, A>
where
    R: UpdateRule,
    A: Iterator,
    F: FnMut(&Array1<f64>, &A::Item) -> Result<Array1<f64>, GradientError>,
{
    type Item = Result<StepReport<A::Item>, OptimizerError>;

    /// 执行恰好一步优化
    ///
    /// 顺序：取批次 → 求梯度 → 算步长 → 原地更新参数 → 计数递增 → 产出报告。
    /// 梯度失败时本步不推进任何内部状态（计数、矩估计、衰减幂均保持原值），
    /// 错误交还驱动方后序列仍可继续拉取。
    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.args.next()?;

        let gradient = match (self.fprime)(&*self.wrt, &batch) {
            Ok(gradient) => gradient,
            Err(e) => return Some(Err(OptimizerError::Gradient(e))),
        };

        let step = self.rule.compute_step(&gradient);
        *self.wrt -= &step;
        self.step = step;
        self.n_iter += 1;

        Some(Ok(StepReport {
            n_iter: self.n_iter,
            gradient,
            batch,
        }))
    }
}
