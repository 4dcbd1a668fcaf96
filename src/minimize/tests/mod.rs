/*
 * @Author       : 老董
 * @Date         : 2026-08-07
 * @Description  : 最小化器模块单元测试（含adam、minimizer、state、convergence子模块）
 */

mod adam;

use approx::assert_abs_diff_eq;
use ndarray::Array1;

/// 逐元素比较两个向量
pub(crate) fn assert_vec_close(actual: &Array1<f64>, expected: &Array1<f64>, epsilon: f64) {
    assert_eq!(actual.len(), expected.len(), "向量长度不一致");
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
    }
}
