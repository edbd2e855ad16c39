use nl5::engine::{CircuitTemplate, FilterBlock, MemoryEngine};
use nl5::schematic::Schematic;
use nl5::sweep::AcSweep;
use nl5::traces::{AcTrace, TraceKind};

fn main() -> Result<(), nl5::errors::Nl5Error> {
    // RC low-pass: V1 -> R1 -> C1.
    let engine = MemoryEngine::new().with_circuit(
        "rc.nl5",
        CircuitTemplate::new()
            .value("V1", 1.0)
            .value("R1", 1.0e3) // 1 kΩ
            .value("C1", 1.0e-6) // 1 µF
            .value("C1.IC", 0.0)
            .block("F1", FilterBlock::analog()),
    );
    let mut rc = Schematic::open(&engine, "rc.nl5")?;

    rc.add_trace("C1", TraceKind::Voltage)?;
    rc.add_trace("R1", TraceKind::Current)?;
    rc.simulate_interval(5.0e-3, 1.0e-3)?;
    rc.continue_interval(5.0e-3, 1.0e-3)?;

    let table = rc.data(None, true)?;
    table.write_csv(std::io::stdout().lock())?;

    rc.set_ac_source("V1")?;
    rc.add_ac_trace(AcTrace::Voltage("C1"))?;
    rc.simulate_ac(&AcSweep::log(10.0, 1.0e5, 9)?)?;

    println!("frequency(Hz), |V(C1)|(dB), phase(deg)");
    for p in rc.ac_trace_data("V(C1)")?.points {
        println!("{:.6e}, {:.3}, {:.3}", p.frequency, p.magnitude_db(), p.phase);
    }
    Ok(())
}
