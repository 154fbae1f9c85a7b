//! Integration harness for the SingleStepTests/m68000 vectors.
//!
//! Each JSON file holds thousands of single-instruction cases with full
//! initial and final CPU/RAM state. The suite is large and not vendored;
//! drop it under `test-data/m68000/v1/` at the workspace root and run with
//! `--ignored`.
//!
//! The vectors model the hardware prefetch queue: `pc` in each state
//! points past the opcode and prefetched word, so the harness rewinds by 4
//! to get the instruction address for an instruction-granular core.

use emu_core::{Bus, SimpleBus};
use motorola_m68k::{Cpu68k, CpuType};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
}

#[derive(Deserialize)]
struct CpuState {
    d0: u32,
    d1: u32,
    d2: u32,
    d3: u32,
    d4: u32,
    d5: u32,
    d6: u32,
    d7: u32,
    a0: u32,
    a1: u32,
    a2: u32,
    a3: u32,
    a4: u32,
    a5: u32,
    a6: u32,
    usp: u32,
    ssp: u32,
    sr: u16,
    pc: u32,
    ram: Vec<(u32, u8)>,
}

fn apply(cpu: &mut Cpu68k, bus: &mut SimpleBus, state: &CpuState) {
    cpu.regs.d = [
        state.d0, state.d1, state.d2, state.d3, state.d4, state.d5, state.d6, state.d7,
    ];
    cpu.regs.a[..7].copy_from_slice(&[
        state.a0, state.a1, state.a2, state.a3, state.a4, state.a5, state.a6,
    ]);
    cpu.set_sr(state.sr);
    cpu.regs.usp = state.usp;
    cpu.regs.isp = state.ssp;
    cpu.regs.a[7] = if state.sr & 0x2000 != 0 {
        state.ssp
    } else {
        state.usp
    };
    cpu.regs.pc = state.pc.wrapping_sub(4);
    for &(addr, value) in &state.ram {
        bus.poke(addr & 0x00FF_FFFF, value);
    }
}

fn compare(cpu: &Cpu68k, bus: &SimpleBus, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    let d = [
        expected.d0, expected.d1, expected.d2, expected.d3,
        expected.d4, expected.d5, expected.d6, expected.d7,
    ];
    for (i, &want) in d.iter().enumerate() {
        if cpu.regs.d[i] != want {
            errors.push(format!("D{i}: got ${:08X}, want ${want:08X}", cpu.regs.d[i]));
        }
    }
    let a = [
        expected.a0, expected.a1, expected.a2, expected.a3,
        expected.a4, expected.a5, expected.a6,
    ];
    for (i, &want) in a.iter().enumerate() {
        if cpu.regs.a[i] != want {
            errors.push(format!("A{i}: got ${:08X}, want ${want:08X}", cpu.regs.a[i]));
        }
    }
    if cpu.get_sr() != expected.sr {
        errors.push(format!("SR: got ${:04X}, want ${:04X}", cpu.get_sr(), expected.sr));
    }
    let want_pc = expected.pc.wrapping_sub(4);
    if cpu.regs.pc != want_pc {
        errors.push(format!("PC: got ${:08X}, want ${want_pc:08X}", cpu.regs.pc));
    }
    for &(addr, want) in &expected.ram {
        let got = bus.peek(addr & 0x00FF_FFFF);
        if got != want {
            errors.push(format!("RAM[${addr:06X}]: got ${got:02X}, want ${want:02X}"));
        }
    }
    errors
}

#[test]
#[ignore = "requires test-data/m68000 — run with --ignored"]
fn run_all() {
    let test_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-data/m68000/v1");
    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        eprintln!("Skipping SingleStepTests.");
        return;
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;

    let mut entries: Vec<_> = fs::read_dir(&test_dir)
        .expect("readable test dir")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
        let cases: Vec<TestCase> = serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()));

        let mut file_fail = 0u32;
        let mut first_failures = Vec::new();

        for case in &cases {
            let mut cpu = Cpu68k::new(CpuType::M68000);
            let mut bus = SimpleBus::new();
            apply(&mut cpu, &mut bus, &case.initial);
            cpu.execute(&mut bus, 1);

            let errors = compare(&cpu, &bus, &case.final_state);
            if errors.is_empty() {
                total_pass += 1;
            } else {
                total_fail += 1;
                file_fail += 1;
                if first_failures.len() < 5 {
                    first_failures.push(format!("  FAIL [{}]: {}", case.name, errors.join(", ")));
                }
            }
        }

        let status = if file_fail == 0 { "PASS" } else { "FAIL" };
        println!("{}: {status}", path.file_name().unwrap().to_string_lossy());
        for line in &first_failures {
            println!("{line}");
        }
    }

    println!();
    println!("=== SingleStepTests Summary ===");
    println!("Pass: {total_pass}, Fail: {total_fail}");
    assert_eq!(total_fail, 0, "{total_fail} vector cases failed");
}
