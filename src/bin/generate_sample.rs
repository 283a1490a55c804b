use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Row {
    timestamp: NaiveDateTime,
    metric: &'static str,
    value: f64,
}

/// One host's log: a request counter with a start-up burst, a noisy heap
/// gauge with rare outliers, and a CPU gauge.
fn generate_host(start: NaiveDateTime, seconds: i64, load: f64, rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut requests = 0.0;

    for s in 0..seconds {
        let timestamp = start + Duration::seconds(s);

        let burst = if s < 4 { 400.0 } else { 0.0 };
        requests += (load * 50.0 + burst + rng.gauss(0.0, 5.0)).max(0.0);
        rows.push(Row {
            timestamp,
            metric: "requests_total",
            value: requests.round(),
        });

        let mut heap = 256.0 + s as f64 * 0.4 * load + rng.gauss(0.0, 3.0);
        if rng.next_f64() < 0.02 {
            heap += 400.0;
        }
        rows.push(Row {
            timestamp,
            metric: "heap_mb",
            value: heap,
        });

        if s % 2 == 0 {
            rows.push(Row {
                timestamp,
                metric: "cpu_pct",
                value: (35.0 * load + rng.gauss(0.0, 4.0)).clamp(0.0, 100.0),
            });
        }
    }
    rows
}

fn write_csv(path: &str, rows: &[Row]) {
    let mut writer = csv::Writer::from_path(path).expect("Failed to create CSV file");
    writer
        .write_record(["Timestamp", "Metric", "Value", "Host"])
        .expect("Failed to write CSV header");
    for row in rows {
        writer
            .write_record([
                row.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                row.metric.to_string(),
                format!("{:.3}", row.value),
                "node-a".to_string(),
            ])
            .expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");
}

fn write_parquet(path: &str, rows: &[Row]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Timestamp", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("Metric", DataType::Utf8, false),
        Field::new("Value", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMillisecondArray::from(
                rows.iter()
                    .map(|r| r.timestamp.and_utc().timestamp_millis())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.metric).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            )),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
    batch
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // The two hosts' clocks disagree by a few minutes.
    let start_a = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid start time");
    let start_b = start_a + Duration::seconds(217);

    let host_a = generate_host(start_a, 180, 1.0, &mut rng);
    let host_b = generate_host(start_b, 240, 1.6, &mut rng);

    write_csv("sample_node_a.csv", &host_a);
    let batch = write_parquet("sample_node_b.parquet", &host_b);

    println!("Wrote {} rows to sample_node_a.csv", host_a.len());
    println!("Wrote {} rows to sample_node_b.parquet", host_b.len());
    match pretty_format_batches(&[batch.slice(0, 6)]) {
        Ok(table) => println!("{table}"),
        Err(e) => eprintln!("cannot preview parquet rows: {e}"),
    }
}
