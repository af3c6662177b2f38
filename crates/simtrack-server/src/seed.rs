//! Default machine fleet seeded at startup.
//!
//! Seeding is idempotent by machine name: a fleet entry whose name is
//! already registered is skipped, so restarts never duplicate machines
//! or clobber operator status changes.

use simtrack_db::{DbError, MachineStore, NewMachine, PostgresPool};

/// One entry of the default fleet.
struct SeedMachine {
    name: &'static str,
    cpu: &'static str,
    gpu: &'static str,
    memory: f64,
    status: &'static str,
}

/// The default machine fleet registered on first startup.
const DEFAULT_MACHINES: [SeedMachine; 5] = [
    SeedMachine {
        name: "gpu-cluster-01",
        cpu: "Intel Xeon E5-2686 v4",
        gpu: "NVIDIA Tesla V100",
        memory: 32.0,
        status: "available",
    },
    SeedMachine {
        name: "gpu-cluster-02",
        cpu: "Intel Xeon E5-2686 v4",
        gpu: "NVIDIA Tesla V100",
        memory: 32.0,
        status: "available",
    },
    SeedMachine {
        name: "cpu-cluster-01",
        cpu: "Intel Xeon Gold 6248R",
        gpu: "None",
        memory: 128.0,
        status: "available",
    },
    SeedMachine {
        name: "gpu-cluster-03",
        cpu: "AMD EPYC 7742",
        gpu: "NVIDIA A100",
        memory: 64.0,
        status: "maintenance",
    },
    SeedMachine {
        name: "hybrid-cluster-01",
        cpu: "Intel Xeon Platinum 8280",
        gpu: "NVIDIA RTX 3090",
        memory: 256.0,
        status: "available",
    },
];

/// Register any fleet machines that are not yet present.
///
/// Returns the number of machines created.
///
/// # Errors
///
/// Returns [`DbError`] if a lookup or insert fails.
pub async fn seed_machines(pool: &PostgresPool) -> Result<u32, DbError> {
    let machines = MachineStore::new(pool.pool());

    let mut created: u32 = 0;
    for entry in &DEFAULT_MACHINES {
        if machines.find_by_name(entry.name).await?.is_none() {
            machines
                .insert(&NewMachine {
                    name: entry.name.to_owned(),
                    cpu: entry.cpu.to_owned(),
                    gpu: entry.gpu.to_owned(),
                    memory: entry.memory,
                    status: entry.status.to_owned(),
                })
                .await?;
            created = created.saturating_add(1);
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_names_are_unique() {
        let mut names: Vec<&str> = DEFAULT_MACHINES.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_MACHINES.len());
    }

    #[test]
    fn fleet_memory_sizes_are_positive() {
        assert!(DEFAULT_MACHINES.iter().all(|m| m.memory > 0.0));
    }
}
