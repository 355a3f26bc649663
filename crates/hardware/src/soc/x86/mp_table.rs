//! Intel MultiProcessor specification table.
//!
//! The table tells the guest kernel which processors exist, where the I/O APIC lives, which
//! buses are present, and how each legacy and PCI interrupt source is routed to an I/O APIC
//! pin.

/// I/O APIC identifier.
pub const IO_APIC_ID: u8 = 1;

/// I/O APIC version.
pub const IO_APIC_VERSION: u8 = 0x11;

/// I/O APIC register window.
pub const IO_APIC_ADDRESS: u64 = 0xfec0_0000;

/// Bus identifier of the PCI bus.
pub const PCI_BUS_ID: u8 = 0;

/// Bus identifier of the ISA bus.
pub const ISA_BUS_ID: u8 = 1;

/// PCI device number of the IDE controller.
pub const IDE_PCI_DEVICE: u8 = 4;

/// I/O APIC pin the IDE controller's INTA line is routed to.
pub const IDE_IRQ: u8 = 16;

/// Kind of interrupt delivered by an assignment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    /// Vectored interrupt.
    Int,
    /// External interrupt from an 8259-compatible controller.
    ExtInt,
}

/// Processor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processor {
    /// Local APIC identifier.
    pub local_apic_id: u8,
    /// Local APIC version.
    pub local_apic_version: u8,
    /// Processor is enabled.
    pub enable: bool,
    /// Processor is the bootstrap processor.
    pub bootstrap: bool,
}

/// I/O APIC entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoApic {
    /// Identifier.
    pub id: u8,
    /// Version.
    pub version: u8,
    /// I/O APIC is enabled.
    pub enable: bool,
    /// Register window address.
    pub address: u64,
}

/// Bus entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bus {
    /// Bus identifier.
    pub id: u8,
    /// Six-character bus type string.
    pub bus_type: &'static str,
}

/// Bus hierarchy entry (an extended table entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusHierarchy {
    /// Child bus.
    pub bus_id: u8,
    /// Parent bus.
    pub parent_bus: u8,
    /// Child bus claims addresses no other device claims.
    pub subtractive_decode: bool,
}

/// Interrupt assignment from a bus source to an I/O APIC pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoIntAssignment {
    /// Interrupt type.
    pub interrupt_type: InterruptType,
    /// Source bus.
    pub source_bus_id: u8,
    /// Source IRQ. For PCI sources this encodes `device << 2 | pin`.
    pub source_bus_irq: u8,
    /// Destination I/O APIC.
    pub dest_io_apic_id: u8,
    /// Destination pin.
    pub dest_io_apic_intin: u8,
}

/// Complete MP table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpTable {
    /// Processors.
    pub processors: Vec<Processor>,
    /// I/O APICs.
    pub io_apics: Vec<IoApic>,
    /// Buses.
    pub buses: Vec<Bus>,
    /// Bus hierarchy (extended entries).
    pub hierarchy: Vec<BusHierarchy>,
    /// Interrupt assignments.
    pub assignments: Vec<IoIntAssignment>,
}

impl MpTable {
    /// Builds the table for a uniprocessor system with one I/O APIC, a PCI bus, and an ISA bus.
    pub fn uniprocessor(local_apic_version: u8) -> Self {
        let processors = vec![Processor {
            local_apic_id: 0,
            local_apic_version,
            enable: true,
            bootstrap: true,
        }];
        let io_apics = vec![IoApic {
            id: IO_APIC_ID,
            version: IO_APIC_VERSION,
            enable: true,
            address: IO_APIC_ADDRESS,
        }];
        let buses = vec![
            Bus {
                id: PCI_BUS_ID,
                bus_type: "PCI   ",
            },
            Bus {
                id: ISA_BUS_ID,
                bus_type: "ISA   ",
            },
        ];
        let hierarchy = vec![BusHierarchy {
            bus_id: ISA_BUS_ID,
            parent_bus: PCI_BUS_ID,
            subtractive_decode: true,
        }];

        let mut assignments = vec![IoIntAssignment {
            interrupt_type: InterruptType::Int,
            source_bus_id: PCI_BUS_ID,
            source_bus_irq: IDE_PCI_DEVICE << 2,
            dest_io_apic_id: IO_APIC_ID,
            dest_io_apic_intin: IDE_IRQ,
        }];
        assignments.extend(isa_assignment(0, 2));
        assignments.extend(isa_assignment(1, 1));
        for irq in 3..=14 {
            assignments.extend(isa_assignment(irq, irq));
        }

        Self {
            processors,
            io_apics,
            buses,
            hierarchy,
            assignments,
        }
    }

    /// Returns the I/O APIC pin an ISA IRQ is delivered on, if assigned.
    pub fn isa_pin(&self, irq: u8) -> Option<u8> {
        self.assignments
            .iter()
            .find(|a| {
                a.interrupt_type == InterruptType::Int
                    && a.source_bus_id == ISA_BUS_ID
                    && a.source_bus_irq == irq
            })
            .map(|a| a.dest_io_apic_intin)
    }
}

/// Routes ISA `irq` both through the 8259 (ExtInt on pin 0) and directly to `pin`.
fn isa_assignment(irq: u8, pin: u8) -> [IoIntAssignment; 2] {
    let entry = |interrupt_type, dest_io_apic_intin| IoIntAssignment {
        interrupt_type,
        source_bus_id: ISA_BUS_ID,
        source_bus_irq: irq,
        dest_io_apic_id: IO_APIC_ID,
        dest_io_apic_intin,
    };
    [entry(InterruptType::ExtInt, 0), entry(InterruptType::Int, pin)]
}
