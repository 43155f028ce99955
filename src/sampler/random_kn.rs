use rand::{Rng, RngCore, seq::index};

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// ==========================================
// 每 N 个包一组，组内无放回随机抽 k 个
// ==========================================
pub struct RandomKnSampler {
    block: u32,
    picks: u32,
    index: u64,
    chosen: Vec<u32>, // 升序，组开始时重新抽
    cursor: usize,    // 下一个待匹配的偏移
}

impl RandomKnSampler {
    pub fn new(block: u32, picks: u32) -> Self {
        assert!(block > 0, "block size must be positive");
        assert!(picks <= block, "cannot pick more than the block holds");
        Self {
            block,
            picks,
            index: 0,
            chosen: Vec::with_capacity(picks as usize),
            cursor: 0,
        }
    }

    // 抽 k 个互不相同的偏移并排序
    fn draw_offsets(&mut self, rng: &mut dyn RngCore) {
        self.chosen.clear();
        self.cursor = 0;

        if 2 * self.picks as u64 <= self.block as u64 {
            // 拒绝采样：k 远小于 N 时期望重抽次数很少
            while self.chosen.len() < self.picks as usize {
                let offset = rng.random_range(0..self.block);
                if !self.chosen.contains(&offset) {
                    self.chosen.push(offset);
                }
            }
        } else {
            // k 接近 N 时拒绝采样会退化，改用无放回索引抽样
            let picked = index::sample(rng, self.block as usize, self.picks as usize);
            self.chosen.extend(picked.iter().map(|i| i as u32));
        }

        self.chosen.sort_unstable();
    }

    #[cfg(test)]
    fn chosen(&self) -> &[u32] {
        &self.chosen
    }
}

impl Sampler for RandomKnSampler {
    fn observe(&mut self, _record: &PacketRecord, rng: &mut dyn RngCore) -> Verdict {
        let offset = (self.index % self.block as u64) as u32;
        if offset == 0 {
            self.draw_offsets(rng);
        }
        self.index += 1;

        // 按升序逐个消费，O(1) 判定
        match self.chosen.get(self.cursor) {
            Some(&next) if next == offset => {
                self.cursor += 1;
                Verdict::Accept
            }
            _ => Verdict::Drop,
        }
    }

    fn name(&self) -> &'static str {
        "COUNT_RAND_KN"
    }
}
