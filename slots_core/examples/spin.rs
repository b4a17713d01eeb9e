use slots_core::{render_line, spin_once, Paytable, ProvablyFairRng};

fn main() {
    // Example end-to-end spin
    let mut rng = ProvablyFairRng::new("example-server-seed", "example-client-seed", 1);
    let paytable = Paytable::classic();
    let hash = rng.server_seed_hash_hex();
    let result = spin_once(&mut rng, &paytable, 1);
    println!(
        "server_seed_hash={} line={} win={} ({}x)",
        hash,
        render_line(&result.symbols),
        result.win_amount,
        result.multiplier
    );
}
