/// 中位数窗口：只取最后 8 个数据点
pub const MEDIAN_WINDOW: usize = 8;

/// 计算中位数
///
/// 取输入顺序中的**最后 8 个**元素（按位置，不是最大/最小的 8 个），
/// 升序排序后奇数取中间值，偶数取中间两值的平均。空输入返回 0。
/// 调用方应按时间从旧到新排列，使"最后 8 个"即最近 8 个。
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let start = values.len().saturating_sub(MEDIAN_WINDOW);
    let mut window = values[start..].to_vec();
    window.sort_by(|a, b| a.total_cmp(b));
    middle_of_sorted(&window)
}

/// 已排序序列的中间值，不做窗口截取
pub(crate) fn middle_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
