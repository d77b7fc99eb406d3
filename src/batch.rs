//! Scheme x SNR variant generation.
//!
//! Every job owns its modem, RNG and buffers. Workers pull jobs from a shared
//! queue and push results back; the caller gets them in plan order.

use std::thread;

use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LinkResult;
use crate::fixed::QuantizedStream;
use crate::modem::{
    BitOrder, Demodulator, LinkConfig, Scheme, bytes_to_bits, count_bit_errors, evm_percent,
};
use crate::ui::progress::{ProgressManager, templates};
use crate::utils::consts::DEFAULT_MESSAGE;

const PROGRESS_ID: &str = "batch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Everything except scheme and SNR
    pub config: LinkConfig,
    pub schemes: Vec<Scheme>,
    pub snrs_db: Vec<f64>,
    pub message: Vec<u8>,
    /// 0 picks the available parallelism
    pub workers: usize,
}

impl BatchPlan {
    pub fn new(config: LinkConfig, schemes: Vec<Scheme>, snrs_db: Vec<f64>) -> Self {
        Self {
            config,
            schemes,
            snrs_db,
            message: DEFAULT_MESSAGE.as_bytes().to_vec(),
            workers: 0,
        }
    }

    /// Scheme-major job list. Job `i` seeds its channel with `seed + i`.
    pub fn jobs(&self) -> Vec<BatchJob> {
        let mut jobs = Vec::with_capacity(self.schemes.len() * self.snrs_db.len());
        for &scheme in &self.schemes {
            for &snr_db in &self.snrs_db {
                let index = jobs.len();
                jobs.push(BatchJob {
                    index,
                    scheme,
                    snr_db,
                    seed: self.config.seed.map(|s| s.wrapping_add(index as u64)),
                });
            }
        }
        jobs
    }

    fn worker_count(&self, n_jobs: usize) -> usize {
        let wanted = if self.workers == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.workers
        };
        wanted.clamp(1, n_jobs.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub index: usize,
    pub scheme: Scheme,
    pub snr_db: f64,
    pub seed: Option<u64>,
}

impl BatchJob {
    /// C identifier for this variant, e.g. `qam16_snr12` or `bpsk_snr_m3p5`
    pub fn array_name(&self) -> String {
        let snr = format!("{}", self.snr_db).replace('-', "_m").replace('.', "p");
        format!("{}_snr{}", self.scheme.key(), snr)
    }

    pub fn run(&self, plan: &BatchPlan) -> LinkResult<BatchResult> {
        let config = LinkConfig {
            scheme: self.scheme,
            snr_db: self.snr_db,
            seed: self.seed,
            ..plan.config.clone()
        };
        let modem = config.modem()?;
        let quantizer = config.quantizer()?;

        let bits = bytes_to_bits(&plan.message, BitOrder::Msb);
        let modulated = modem.modulate(&bits, &config.modulate_options())?;
        let stream = quantizer.quantize(&modulated.stream, &modulated.info)?;
        let received = stream.dequantize()?;
        let demod = Demodulator::new(self.scheme, config.demod);
        let symbols = demod.recover_symbols(&received, &modulated.info)?;
        let decoded = demod.slice_bits(&symbols, modulated.info.n_bits);

        let bit_errors = count_bit_errors(&bits, &decoded);
        let evm = evm_percent(self.scheme, &symbols);
        debug!(
            "job {} ({} @ {} dB): {} / {} bit errors, EVM {:.2}%",
            self.index,
            self.scheme,
            self.snr_db,
            bit_errors,
            bits.len(),
            evm
        );

        Ok(BatchResult {
            job: *self,
            n_bits: bits.len(),
            bit_errors,
            evm_percent: evm,
            noise_std: modulated.info.noise_std,
            stream,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub job: BatchJob,
    pub n_bits: usize,
    pub bit_errors: usize,
    /// Post-filter EVM against the ideal constellation
    pub evm_percent: f64,
    pub noise_std: f64,
    pub stream: QuantizedStream,
}

impl BatchResult {
    pub fn ber(&self) -> f64 {
        if self.n_bits == 0 {
            0.0
        } else {
            self.bit_errors as f64 / self.n_bits as f64
        }
    }
}

pub fn run_batch(plan: &BatchPlan) -> LinkResult<Vec<BatchResult>> {
    let jobs = plan.jobs();
    if jobs.is_empty() {
        warn!("Batch plan has no jobs");
        return Ok(Vec::new());
    }
    let workers = plan.worker_count(jobs.len());
    info!("Running {} batch jobs on {} workers", jobs.len(), workers);

    let progress = ProgressManager::new();
    progress.create_bar(PROGRESS_ID, jobs.len() as u64, templates::BATCH, "");

    let (job_tx, job_rx) = unbounded::<BatchJob>();
    let (result_tx, result_rx) = unbounded::<(usize, LinkResult<BatchResult>)>();
    for job in &jobs {
        // receiver is alive until the scope below ends
        let _ = job_tx.send(*job);
    }
    drop(job_tx);

    let mut finished: Vec<(usize, LinkResult<BatchResult>)> = Vec::with_capacity(jobs.len());
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    if result_tx.send((job.index, job.run(plan))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        while let Ok((index, result)) = result_rx.recv() {
            let label = format!("{} @ {} dB", jobs[index].scheme, jobs[index].snr_db);
            progress.inc(PROGRESS_ID, 1);
            progress.set_message(PROGRESS_ID, &label);
            finished.push((index, result));
        }
    });
    progress.finish(PROGRESS_ID, "done");

    // a panicking worker propagates out of the scope, so every job reported
    finished.sort_by_key(|(index, _)| *index);
    let results = finished
        .into_iter()
        .map(|(_, result)| result)
        .collect::<LinkResult<Vec<_>>>()?;

    for result in &results {
        info!(
            "{} @ {} dB: BER {:.3e} ({} / {}), EVM {:.2}%",
            result.job.scheme,
            result.job.snr_db,
            result.ber(),
            result.bit_errors,
            result.n_bits,
            result.evm_percent
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(seed: Option<u64>) -> BatchPlan {
        let config = LinkConfig {
            carrier_freq: Some(0.0),
            seed,
            ..LinkConfig::default()
        };
        let mut plan = BatchPlan::new(config, Scheme::ALL.to_vec(), vec![40.0, 30.0]);
        plan.workers = 3;
        plan
    }

    #[test]
    fn test_jobs_are_scheme_major() {
        let jobs = plan(Some(10)).jobs();
        assert_eq!(jobs.len(), 6);
        assert_eq!(jobs[0].scheme, Scheme::Bpsk);
        assert_eq!(jobs[1].snr_db, 30.0);
        assert_eq!(jobs[2].scheme, Scheme::Qpsk);
        assert_eq!(jobs[5].seed, Some(15));
        assert!(plan(None).jobs().iter().all(|job| job.seed.is_none()));
    }

    #[test]
    fn test_array_names() {
        let job = BatchJob {
            index: 0,
            scheme: Scheme::Qam16,
            snr_db: 12.0,
            seed: None,
        };
        assert_eq!(job.array_name(), "qam16_snr12");
        let job = BatchJob { snr_db: -3.5, scheme: Scheme::Bpsk, ..job };
        assert_eq!(job.array_name(), "bpsk_snr_m3p5");
    }

    #[test]
    fn test_results_in_plan_order() {
        let plan = plan(Some(333));
        let results = run_batch(&plan).unwrap();
        let jobs = plan.jobs();
        assert_eq!(results.len(), jobs.len());
        for (result, job) in results.iter().zip(&jobs) {
            assert_eq!(result.job, *job);
            assert_eq!(result.n_bits, plan.message.len() * 8);
            assert_eq!(result.bit_errors, 0, "{} @ {} dB", job.scheme, job.snr_db);
            assert!(result.evm_percent > 0.0 && result.evm_percent < 10.0);
        }
    }

    #[test]
    fn test_jobs_are_independent_of_worker_count() {
        let mut serial = plan(Some(7));
        serial.workers = 1;
        let parallel = plan(Some(7));
        let a = run_batch(&serial).unwrap();
        let b = run_batch(&parallel).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.stream.words, y.stream.words);
        }
    }

    #[test]
    fn test_failing_job_reports_its_error() {
        let mut plan = plan(Some(1));
        plan.config.sampling_rate = 5e9;
        plan.config.link_bw = 1e9;
        assert!(run_batch(&plan).is_err());
    }

    #[test]
    fn test_evm_drops_with_snr() {
        let results = run_batch(&plan(Some(21))).unwrap();
        // jobs alternate 40 dB, 30 dB per scheme
        for pair in results.chunks(2) {
            assert!(pair[0].evm_percent < pair[1].evm_percent);
        }
    }

    #[test]
    fn test_empty_plan() {
        let mut plan = plan(None);
        plan.snrs_db.clear();
        assert!(run_batch(&plan).unwrap().is_empty());
    }
}
