// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The network, its pretrained weights and the training loop.
//
// What's in this layer:
//
//   model.rs      — ResNet with Bottleneck blocks, laid out with
//                   torchvision's parameter names:
//                   • 7×7 stem conv + batch norm + max pool
//                   • four stages of bottleneck blocks
//                   • global average pool
//                   • fully connected classification head
//
//   pretrained.rs — Loads torchvision `.pth` weights into the
//                   ImageNet-headed network, then swaps the head
//                   for one sized to the dataset's classes
//
//   scheduler.rs  — Step-decay learning rate schedule
//
//   trainer.rs    — The epoch loop: train phase, val phase,
//                   best-weights tracking, checkpoint per epoch,
//                   loss curve at the end
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            He et al. (2016) Deep Residual Learning

/// ResNet-50/101/152 architecture
pub mod model;

/// Pretrained backbone loading and head replacement
pub mod pretrained;

/// StepLR learning-rate decay
pub mod scheduler;

/// Full training loop with validation and checkpointing
pub mod trainer;
