//incremental rolling statistics over a fixed-length trailing window
//sum and sum of squares are updated as the window slides, so every index costs O(1).
//both sums are rebuilt from the window contents once per full cycle and whenever an
//evicted value dwarfs what remains, so rounding left behind by large values does not
//outlive them

//relative variance below which a window is treated as flat
const FLAT_VARIANCE_EPSILON: f64 = 1e-12;

//evicted square to remaining sum of squares ratio that forces a rebuild
const RESYNC_RATIO: f64 = 1e3;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    len: usize,
    values: Vec<f64>,
    sum: f64,
    sum_sq: f64,
    //compensation terms (kahan) for sum and sum_sq
    sum_c: f64,
    sum_sq_c: f64,
    next: usize,
    filled: usize,
    //largest squared value evicted since the last rebuild
    evicted_peak: f64,
}

impl RollingWindow {
    pub fn new(len: usize) -> Self {
        RollingWindow {
            len,
            values: vec![0.0; len],
            sum: 0.0,
            sum_sq: 0.0,
            sum_c: 0.0,
            sum_sq_c: 0.0,
            next: 0,
            filled: 0,
            evicted_peak: 0.0,
        }
    }

    //pushes a value, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        if self.len == 0 {
            return;
        }

        if self.filled == self.len {
            let old = self.values[self.next];
            kahan_add(&mut self.sum, &mut self.sum_c, -old);
            kahan_add(&mut self.sum_sq, &mut self.sum_sq_c, -old * old);
            self.evicted_peak = self.evicted_peak.max(old * old);
        } else {
            self.filled += 1;
        }

        self.values[self.next] = value;
        kahan_add(&mut self.sum, &mut self.sum_c, value);
        kahan_add(&mut self.sum_sq, &mut self.sum_sq_c, value * value);
        self.next = (self.next + 1) % self.len;

        if self.is_full()
            && (self.next == 0 || self.evicted_peak > RESYNC_RATIO * self.sum_sq.abs())
        {
            self.resync();
        }
    }

    //recomputes both sums from the values in the window, oldest first
    fn resync(&mut self) {
        self.sum = 0.0;
        self.sum_c = 0.0;
        self.sum_sq = 0.0;
        self.sum_sq_c = 0.0;
        self.evicted_peak = 0.0;

        let (newest, oldest) = self.values.split_at(self.next);
        for &v in oldest.iter().chain(newest.iter()) {
            kahan_add(&mut self.sum, &mut self.sum_c, v);
            kahan_add(&mut self.sum_sq, &mut self.sum_sq_c, v * v);
        }
    }

    pub fn is_full(&self) -> bool {
        self.len > 0 && self.filled == self.len
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.sum / self.len as f64)
    }

    //sample variance (n - 1 denominator); None until full or for windows of one
    pub fn variance(&self) -> Option<f64> {
        if !self.is_full() || self.len < 2 {
            return None;
        }
        let n = self.len as f64;
        let mean = self.sum / n;
        let var = (self.sum_sq - n * mean * mean) / (n - 1.0);

        let scale = (mean * mean).max(f64::MIN_POSITIVE);
        if var <= FLAT_VARIANCE_EPSILON * scale {
            Some(0.0)
        } else {
            Some(var)
        }
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

fn kahan_add(sum: &mut f64, compensation: &mut f64, value: f64) {
    let y = value - *compensation;
    let t = *sum + y;
    *compensation = (t - *sum) - y;
    *sum = t;
}
