use nl5::engine::{CircuitTemplate, FilterBlock, MemoryEngine};
use nl5::filter::{FilterDomain, SecondOrderSection};
use nl5::schematic::Schematic;

fn main() -> Result<(), nl5::errors::Nl5Error> {
    let engine = MemoryEngine::new().with_circuit(
        "filters.nl5",
        CircuitTemplate::new()
            .block("Fs", FilterBlock::analog())
            .block("Fz", FilterBlock::digital())
            .block("Fq", FilterBlock::digital().with_model("Biquad")),
    );
    let mut circuit = Schematic::open(&engine, "filters.nl5")?;

    // 2nd order Butterworth, wc = 1 rad/s, highest power of s first.
    let b = [0.0, 0.0, 1.0];
    let a = [1.0, std::f64::consts::SQRT_2, 1.0];
    circuit.load_filter_params("Fs", &b, &a, FilterDomain::Analog)?;

    // Same response after the bilinear transform at fs = 4 rad/s, in powers of z^-1.
    let bz = [0.097_631_1, 0.195_262_2, 0.097_631_1];
    let az = [1.0, -0.942_809_0, 0.333_333_3];
    circuit.load_filter_params("Fz", &bz, &az, FilterDomain::Digital)?;

    let section = SecondOrderSection::new([bz[0], bz[1], bz[2], az[0], az[1], az[2]])?;
    circuit.set_filter_params_sos("Fq", section)?;

    for block in ["Fs", "Fz"] {
        println!("{block}.model = {}", circuit.get_text(&format!("{block}.model"))?);
        for i in 0..3 {
            println!(
                "  b{i} = {:+.7}  a{i} = {:+.7}",
                circuit.get_value(&format!("{block}.b{i}"))?,
                circuit.get_value(&format!("{block}.a{i}"))?
            );
        }
    }
    println!("{} field writes", engine.writes().len());
    Ok(())
}
