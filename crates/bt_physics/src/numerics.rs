// crates/bt_physics/src/numerics.rs

//! 三对角求解
//!
//! Thomas 算法，O(n)。系统形式：
//!
//! ```text
//! a[i]·x[i-1] + b[i]·x[i] + c[i]·x[i+1] = d[i]
//! ```
//!
//! `a[0]` 和 `c[n-1]` 不参与计算。

use crate::error::{TransportError, TransportResult};

/// 主元判零阈值
const PIVOT_EPS: f64 = 1e-300;

/// 三对角系统工作区
///
/// 同一箱体的所有示踪剂共用一组系数，只替换右端项。
#[derive(Debug, Clone)]
pub struct TridiagonalWorkspace {
    /// 下对角
    pub a: Vec<f64>,
    /// 主对角
    pub b: Vec<f64>,
    /// 上对角
    pub c: Vec<f64>,
    /// 右端项，求解后为解
    pub d: Vec<f64>,
    c_prime: Vec<f64>,
}

impl TridiagonalWorkspace {
    /// 创建 n 阶工作区
    pub fn new(n: usize) -> Self {
        Self {
            a: vec![0.0; n],
            b: vec![0.0; n],
            c: vec![0.0; n],
            d: vec![0.0; n],
            c_prime: vec![0.0; n],
        }
    }

    /// 阶数
    #[inline]
    pub fn len(&self) -> usize {
        self.d.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    /// 原位求解，结果写入 `d`
    pub fn solve(&mut self) -> TransportResult<()> {
        thomas_solve_inplace(&self.a, &self.b, &self.c, &mut self.d, &mut self.c_prime)
    }
}

/// Thomas 算法原位求解
///
/// 主元为零时返回 [`TransportError::SingularSystem`]。
pub fn thomas_solve_inplace(
    a: &[f64],
    b: &[f64],
    c: &[f64],
    d: &mut [f64],
    c_prime: &mut [f64],
) -> TransportResult<()> {
    let n = d.len();
    if n == 0 {
        return Ok(());
    }
    TransportError::check_len("三对角下对角", n, a.len())?;
    TransportError::check_len("三对角主对角", n, b.len())?;
    TransportError::check_len("三对角上对角", n, c.len())?;
    TransportError::check_len("三对角工作区", n, c_prime.len())?;

    let denom = b[0];
    if denom.abs() < PIVOT_EPS || !denom.is_finite() {
        return Err(TransportError::SingularSystem { row: 0, pivot: denom });
    }
    c_prime[0] = c[0] / denom;
    d[0] /= denom;

    for i in 1..n {
        let denom = b[i] - a[i] * c_prime[i - 1];
        if denom.abs() < PIVOT_EPS || !denom.is_finite() {
            log::debug!("Thomas 消元第 {} 行主元异常: {:.3e}", i, denom);
            return Err(TransportError::SingularSystem { row: i, pivot: denom });
        }
        c_prime[i] = c[i] / denom;
        d[i] = (d[i] - a[i] * d[i - 1]) / denom;
    }

    for i in (0..n - 1).rev() {
        d[i] -= c_prime[i] * d[i + 1];
    }

    Ok(())
}
