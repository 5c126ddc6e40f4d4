//! Invocation package and per-piece context.
//!
//! The package is what one `execute` call shares with all of its workers:
//! borrowed input volumes, shared output volumes, and the full extent. It
//! lives on the engine's stack and is dropped once the barrier is passed,
//! releasing the borrows. It never owns buffer contents.

use crate::core::error::{OperationError, OperationResult};
use crate::core::extent::Extent;
use crate::core::volume::{RegionWriter, SharedVolume, Volume};
use serde::{Deserialize, Serialize};

/// One unit of work handed to a worker or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Worker id (fixed pool) or scheduler-assigned block index (dynamic).
    pub id: usize,
    /// The sub-extent passed to the operation.
    pub extent: Extent,
    /// The region of the outputs this piece may write.
    ///
    /// Equal to `extent` except for dynamic blocks of operations that
    /// re-derive axis 2, where it spans the full slice range.
    pub region: Extent,
}

impl Piece {
    /// A piece whose writable region equals its extent.
    pub fn new(id: usize, extent: Extent) -> Self {
        Self {
            id,
            extent,
            region: extent,
        }
    }
}

/// References shared by every worker of one dispatch.
pub struct InvocationPackage<'a, I, O> {
    inputs: Vec<Vec<&'a Volume<I>>>,
    outputs: Vec<SharedVolume<'a, O>>,
    extent: Extent,
}

impl<'a, I, O> InvocationPackage<'a, I, O> {
    /// Assemble a package. Outputs stay exclusively borrowed until the
    /// package is dropped.
    pub fn new(
        inputs: &[Vec<&'a Volume<I>>],
        outputs: &'a mut [&mut Volume<O>],
        extent: Extent,
    ) -> Self {
        Self {
            inputs: inputs.to_vec(),
            outputs: outputs
                .iter_mut()
                .map(|volume| SharedVolume::new(&mut **volume))
                .collect(),
            extent,
        }
    }

    /// The full extent being processed.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Number of input ports.
    pub fn input_ports(&self) -> usize {
        self.inputs.len()
    }

    /// Number of connections on one input port.
    pub fn input_connections(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Number of output ports.
    pub fn output_ports(&self) -> usize {
        self.outputs.len()
    }
}

/// What an operation sees while processing one piece.
pub struct PieceContext<'p, I, O> {
    package: &'p InvocationPackage<'p, I, O>,
    piece: Piece,
}

impl<'p, I, O> PieceContext<'p, I, O> {
    pub(crate) fn new(package: &'p InvocationPackage<'p, I, O>, piece: Piece) -> Self {
        Self { package, piece }
    }

    /// The sub-extent assigned to this piece.
    pub fn extent(&self) -> Extent {
        self.piece.extent
    }

    /// The region this piece may write.
    pub fn region(&self) -> Extent {
        self.piece.region
    }

    /// Worker id or block index.
    pub fn piece_id(&self) -> usize {
        self.piece.id
    }

    /// The full extent of the whole call.
    pub fn full_extent(&self) -> Extent {
        self.package.extent
    }

    /// The true axis-2 range of the call, for operations that re-derive it.
    pub fn slice_range(&self) -> (i32, i32) {
        self.package.extent.axis(2)
    }

    /// Number of input ports.
    pub fn input_ports(&self) -> usize {
        self.package.input_ports()
    }

    /// Number of output ports.
    pub fn output_ports(&self) -> usize {
        self.package.output_ports()
    }

    /// Read-only access to one input connection.
    pub fn input(&self, port: usize, connection: usize) -> OperationResult<&'p Volume<I>> {
        self.package
            .inputs
            .get(port)
            .and_then(|connections| connections.get(connection))
            .copied()
            .ok_or(OperationError::MissingInput { port, connection })
    }

    /// Shorthand for the first connection of the first input port.
    pub fn first_input(&self) -> OperationResult<&'p Volume<I>> {
        self.input(0, 0)
    }

    /// A writer for this piece's region of one output.
    pub fn output(&mut self, port: usize) -> OperationResult<RegionWriter<'_, O>> {
        let region = self.piece.region;
        self.package
            .outputs
            .get(port)
            .map(|shared| shared.region_writer(region))
            .ok_or(OperationError::MissingOutput { port })
    }
}
