//! 批次管理模块
//!
//! 将文本单元按顺序切分为大小受限的连续批次。
//! 不合并、不排序：拼接所有批次即得到原序列。

use std::sync::atomic::{AtomicUsize, Ordering};

use super::collector::TextUnit;

/// 一次翻译请求对应的批次
#[derive(Debug, Clone)]
pub struct Batch {
    /// 批次编号，从 1 开始
    pub id: usize,
    pub units: Vec<TextUnit>,
}

impl Batch {
    pub fn new(id: usize, units: Vec<TextUnit>) -> Self {
        Self { id, units }
    }

    /// 各单元的原文快照，顺序与单元一致
    pub fn originals(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.original.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 原文总字符数
    pub fn total_chars(&self) -> usize {
        self.units.iter().map(|unit| unit.original.chars().count()).sum()
    }
}

/// 批次管理器
#[derive(Debug)]
pub struct BatchManager {
    batch_size: usize,
    stats: BatchStats,
}

impl BatchManager {
    /// 创建批次管理器，大小为 0 时按 1 处理
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            stats: BatchStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 切分批次
    pub fn create_batches(&self, units: Vec<TextUnit>) -> Vec<Batch> {
        let input = units.len();
        let batches = batch(units, self.batch_size);

        self.stats.input_units.fetch_add(input, Ordering::Relaxed);
        self.stats
            .output_batches
            .fetch_add(batches.len(), Ordering::Relaxed);

        tracing::debug!(
            "创建 {} 个批次（{} 个单元，批次上限 {}）",
            batches.len(),
            input,
            self.batch_size
        );

        batches
    }

    pub fn get_stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn reset_stats(&self) {
        self.stats.input_units.store(0, Ordering::Relaxed);
        self.stats.output_batches.store(0, Ordering::Relaxed);
    }
}

/// 将单元切分为至多 `size` 个一组的连续批次
pub fn batch(units: Vec<TextUnit>, size: usize) -> Vec<Batch> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(units.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(units.len()));

    for unit in units {
        current.push(unit);
        if current.len() == size {
            let id = batches.len() + 1;
            batches.push(Batch::new(id, std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        let id = batches.len() + 1;
        batches.push(Batch::new(id, current));
    }

    batches
}

/// 批次统计
#[derive(Debug, Default)]
pub struct BatchStats {
    pub input_units: AtomicUsize,
    pub output_batches: AtomicUsize,
}

impl BatchStats {
    pub fn input_units(&self) -> usize {
        self.input_units.load(Ordering::Relaxed)
    }

    pub fn output_batches(&self) -> usize {
        self.output_batches.load(Ordering::Relaxed)
    }
}
