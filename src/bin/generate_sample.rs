use serde::Serialize;

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

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One raw customer record as a document-store export would carry it,
/// including the fields the dashboard strips before display.
#[derive(Serialize)]
struct SampleCustomer {
    _id: i64,
    username: String,
    name: String,
    email: String,
    address: String,
    /// Day-first date string, left for the dashboard to promote to temporal.
    birthdate: String,
    tier: String,
    balance: f64,
    accounts: Vec<i64>,
    tier_and_details: TierDetails,
    active: bool,
}

#[derive(Serialize)]
struct TierDetails {
    tier: String,
    benefits: Vec<String>,
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let first_names = ["Ada", "Bo", "Carmen", "Dmitri", "Elena", "Farid", "Grace", "Hugo"];
    let last_names = ["Ng", "Okafor", "Petrov", "Quinn", "Rossi", "Sato", "Torres", "Ueda"];
    let streets = ["Maple St", "Oak Ave", "Pine Rd", "Cedar Ln", "Birch Way"];
    let tiers = ["Basic", "Bronze", "Silver", "Gold"];
    let benefits = ["airline lounge access", "concert tickets", "dedicated account representative"];

    let customers: Vec<SampleCustomer> = (0..60)
        .map(|n| {
            let first = rng.pick(&first_names);
            let last = rng.pick(&last_names);
            let tier = rng.pick(&tiers).to_string();
            let day = rng.next_u64() % 28 + 1;
            let month = rng.next_u64() % 12 + 1;
            let year = 1950 + rng.next_u64() % 50;

            SampleCustomer {
                _id: n,
                username: format!("{}{}{n:02}", first.to_lowercase(), last.to_lowercase()),
                name: format!("{first} {last}"),
                email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
                address: format!(
                    "{} {}",
                    rng.next_u64() % 900 + 100,
                    rng.pick(&streets)
                ),
                birthdate: format!("{day:02}/{month:02}/{year}"),
                tier: tier.clone(),
                balance: (rng.next_f64() * 10_000.0 * 100.0).round() / 100.0,
                accounts: (0..rng.next_u64() % 3 + 1)
                    .map(|k| 100_000 + n * 10 + k as i64)
                    .collect(),
                tier_and_details: TierDetails {
                    tier,
                    benefits: vec![rng.pick(&benefits).to_string()],
                },
                active: rng.next_f64() > 0.2,
            }
        })
        .collect();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_customers.json".to_string());
    let json = serde_json::to_string_pretty(&customers).expect("serialize sample customers");
    std::fs::write(&path, json).expect("write sample file");

    println!("Wrote {} customers to {path}", customers.len());
}
