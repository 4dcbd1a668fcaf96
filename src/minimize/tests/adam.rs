/*
 * @Author       : 老董
 * @Date         : 2026-08-07
 * @LastEditTime : 2026-08-27
 * @Description  : Adam更新规则测试：构造校验、提示、首步闭式解、两种模式
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array1, array};

use super::assert_vec_close;
use crate::errors::{Advisory, OptimizerError};
use crate::minimize::{Adam, AdamConfig, Minimizer, StepRate};

// ============================================================================
// 构造校验
// ============================================================================

#[test]
fn test_decay_mom1_domain_validation() {
    for bad in [0.0, -0.1, 1.0001, 2.0] {
        let result = Adam::with_config(AdamConfig::new().decay_mom1(bad));
        assert_eq!(
            result.unwrap_err(),
            OptimizerError::InvalidDecay {
                name: "decay_mom1",
                value: bad
            }
        );
    }
    // 边界值1和接近0的正数都合法
    assert!(Adam::with_config(AdamConfig::new().decay_mom1(1.0)).is_ok());
    assert!(Adam::with_config(AdamConfig::new().decay_mom1(1e-9)).is_ok());
}

#[test]
fn test_decay_mom2_domain_validation() {
    for bad in [0.0, -0.5, 1.5] {
        let result = Adam::with_config(AdamConfig::new().decay_mom2(bad));
        assert_eq!(
            result.unwrap_err(),
            OptimizerError::InvalidDecay {
                name: "decay_mom2",
                value: bad
            }
        );
    }
    assert!(Adam::with_config(AdamConfig::new().decay_mom2(1.0)).is_ok());
}

#[test]
fn test_default_config_values() {
    let config = AdamConfig::default();
    assert_eq!(config.step_rate, StepRate::Scalar(2e-4));
    assert_eq!(config.decay_mom1, 0.1);
    assert_eq!(config.decay_mom2, 0.001);
    assert!(!config.momentum);
    assert_eq!(config.offset, 1e-8);
    assert_eq!(config.decay, None);
}

// ============================================================================
// 构造期提示
// ============================================================================

#[test]
fn test_default_config_emits_no_advisory() {
    let (_, advisories) = Adam::with_config(AdamConfig::default()).unwrap();
    assert!(advisories.is_empty());
}

#[test]
fn test_convergence_constraint_advisory() {
    // (1 - 2*0.0001) / sqrt(1 - 0.5) ≈ 1.414 >= 1，违反收敛性约束
    let (_, advisories) =
        Adam::with_config(AdamConfig::new().decay_mom1(0.0001).decay_mom2(0.5)).unwrap();
    assert!(advisories.contains(&Advisory::ConvergenceConstraint));
}

#[test]
fn test_deprecated_decay_advisory() {
    let (_, advisories) = Adam::with_config(AdamConfig::new().decay(0.9)).unwrap();
    assert_eq!(advisories, vec![Advisory::DeprecatedDecay]);
}

// ============================================================================
// 首步闭式解
// ============================================================================

#[test]
fn test_first_step_closed_form() {
    let step_rate = 0.0002;
    let dm1 = 0.1;
    let dm2 = 0.001;
    let offset = 1e-8;
    let g = array![1.0, -2.0, 3.0];

    let mut pars = array![0.5, 0.5, 0.5];
    let pars_before = pars.clone();
    let gradient = g.clone();
    let (adam, _) = Adam::with_config(
        AdamConfig::new()
            .step_rate(step_rate)
            .decay_mom1(dm1)
            .decay_mom2(dm2)
            .offset(offset),
    )
    .unwrap();
    let mut opt = Minimizer::unbatched(&mut pars, move |_, _: &()| Ok(gradient.clone()), adam);

    opt.next().unwrap().unwrap();
    let state = opt.extract_state();

    // 首步后的累积幂应是一次幂而非平方
    assert_abs_diff_eq!(state.decay_mom1_pow, 1.0 - dm1, epsilon = 1e-15);
    assert_abs_diff_eq!(state.decay_mom2_pow, 1.0 - dm2, epsilon = 1e-15);

    // m₁ = d1·g，v₁ = d2·g²
    assert_vec_close(&state.est_mom1_b, &(&g * dm1), 1e-15);
    assert_vec_close(&state.est_mom2_b, &((&g * &g) * dm2), 1e-15);

    // step₁ = α·√(1-(1-d2))/(1-(1-d1)) · m₁/(√v₁+ε)
    let rate_t = step_rate * (1.0 - (1.0 - dm2)).sqrt() / (1.0 - (1.0 - dm1));
    let expected_step = (&g * dm1) / (((&g * &g) * dm2).mapv(f64::sqrt) + offset) * rate_t;
    assert_vec_close(&state.step, &expected_step, 1e-15);
    drop(opt);
    assert_vec_close(&pars, &(&pars_before - &expected_step), 1e-15);
}

// ============================================================================
// Nesterov模式与逐参数步长
// ============================================================================

#[test]
fn test_nesterov_differs_from_standard() {
    let g = array![1.0, -2.0, 3.0];
    let run_one_step = |momentum: bool| -> Array1<f64> {
        let mut pars = Array1::zeros(3);
        let gradient = g.clone();
        let (adam, _) = Adam::with_config(AdamConfig::new().momentum(momentum)).unwrap();
        let mut opt = Minimizer::unbatched(&mut pars, move |_, _: &()| Ok(gradient.clone()), adam);
        opt.next().unwrap().unwrap();
        opt.last_step().clone()
    };

    let standard = run_one_step(false);
    let nesterov = run_one_step(true);
    let max_diff = standard
        .iter()
        .zip(nesterov.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f64, f64::max);
    assert!(
        max_diff > 1e-10,
        "两种模式对同一梯度应得到不同步长，实际最大差异为{max_diff}"
    );
}

#[test]
fn test_nesterov_first_step_closed_form() {
    let dm1 = 0.1;
    let dm2 = 0.001;
    let step_rate = 0.01;
    let offset = 1e-8;
    let g = array![2.0, -1.0];

    let mut pars = Array1::zeros(2);
    let gradient = g.clone();
    let (adam, _) = Adam::with_config(
        AdamConfig::new()
            .step_rate(step_rate)
            .decay_mom1(dm1)
            .decay_mom2(dm2)
            .momentum(true)
            .offset(offset),
    )
    .unwrap();
    let mut opt = Minimizer::unbatched(&mut pars, move |_, _: &()| Ok(gradient.clone()), adam);
    opt.next().unwrap().unwrap();

    // t=1：pow1 = 1-d1，m̂ = (1-d1)·m/(1-(1-d1)²) + d1·g/(1-(1-d1))，v̂ = v/(1-(1-d2))
    let pow1 = 1.0 - dm1;
    let pow2 = 1.0 - dm2;
    let m1 = &g * dm1;
    let v1 = (&g * &g) * dm2;
    let est_mom1 = &m1 * ((1.0 - dm1) / (1.0 - (1.0 - dm1) * pow1)) + &g * (dm1 / (1.0 - pow1));
    let est_mom2 = &v1 / (1.0 - pow2);
    let expected_step = est_mom1 / (est_mom2.mapv(f64::sqrt) + offset) * step_rate;
    assert_vec_close(opt.last_step(), &expected_step, 1e-15);
}

#[test]
fn test_per_parameter_step_rate() {
    // 第二个参数的步长率为0，应完全不动
    let mut pars = array![1.0, 1.0];
    let (adam, _) =
        Adam::with_config(AdamConfig::new().step_rate(array![0.1, 0.0])).unwrap();
    let mut opt = Minimizer::unbatched(
        &mut pars,
        |w: &Array1<f64>, _: &()| Ok(w.clone()),
        adam,
    );
    for report in opt.by_ref().take(10) {
        report.unwrap();
    }
    drop(opt);
    assert!(pars[0] < 1.0);
    assert_abs_diff_eq!(pars[1], 1.0, epsilon = 1e-15);
}

// ============================================================================
// 遗留decay参数不影响行为
// ============================================================================

#[test]
fn test_deprecated_decay_has_no_effect() {
    let run = |config: AdamConfig| -> Array1<f64> {
        let mut pars = array![1.0, -1.0];
        let (adam, _) = Adam::with_config(config).unwrap();
        let mut opt = Minimizer::unbatched(
            &mut pars,
            |w: &Array1<f64>, _: &()| Ok(w * 2.0),
            adam,
        );
        for report in opt.by_ref().take(5) {
            report.unwrap();
        }
        drop(opt);
        pars
    };

    let without = run(AdamConfig::new().step_rate(0.01));
    let with = run(AdamConfig::new().step_rate(0.01).decay(0.7));
    assert_eq!(without, with);
}
