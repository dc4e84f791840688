use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Output channels of a bottleneck = width * EXPANSION.
pub const EXPANSION: usize = 4;

/// Classes of the ImageNet head shipped with torchvision weights.
pub const IMAGENET_CLASSES: usize = 1000;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Bottleneck blocks per stage.
    pub blocks:      [usize; 4],
    pub num_classes: usize,
    /// Width of the first stage. Pretrained weights need 64.
    #[config(default = 64)]
    pub base_width:  usize,
}

impl ResNetConfig {
    pub fn resnet50(num_classes: usize) -> Self {
        Self::new([3, 4, 6, 3], num_classes)
    }

    pub fn resnet101(num_classes: usize) -> Self {
        Self::new([3, 4, 23, 3], num_classes)
    }

    pub fn resnet152(num_classes: usize) -> Self {
        Self::new([3, 8, 36, 3], num_classes)
    }

    pub fn by_depth(depth: usize, num_classes: usize) -> Option<Self> {
        match depth {
            50  => Some(Self::resnet50(num_classes)),
            101 => Some(Self::resnet101(num_classes)),
            152 => Some(Self::resnet152(num_classes)),
            _   => None,
        }
    }

    /// Channels entering the classification layer.
    pub fn fc_in_features(&self) -> usize {
        self.base_width * 8 * EXPANSION
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let w = self.base_width;

        let conv1 = Conv2dConfig::new([3, w], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1     = BatchNormConfig::new(w).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut in_channels = w;
        let layer1 = build_stage(&mut in_channels, w,     self.blocks[0], 1, device);
        let layer2 = build_stage(&mut in_channels, w * 2, self.blocks[1], 2, device);
        let layer3 = build_stage(&mut in_channels, w * 4, self.blocks[2], 2, device);
        let layer4 = build_stage(&mut in_channels, w * 8, self.blocks[3], 2, device);

        let avgpool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc      = LinearConfig::new(self.fc_in_features(), self.num_classes).init(device);

        ResNet {
            conv1, bn1, relu: Relu::new(), maxpool,
            layer1, layer2, layer3, layer4,
            avgpool, fc,
        }
    }
}

fn build_stage<B: Backend>(
    in_channels: &mut usize,
    width:       usize,
    blocks:      usize,
    stride:      usize,
    device:      &B::Device,
) -> Vec<Bottleneck<B>> {
    let out_channels = width * EXPANSION;
    (0..blocks)
        .map(|i| {
            let s = if i == 0 { stride } else { 1 };
            let block = Bottleneck::new(*in_channels, width, s, device);
            *in_channels = out_channels;
            block
        })
        .collect()
}

/// 1x1 projection on the residual path when shape changes.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// 1x1 reduce → 3x3 (strided) → 1x1 expand, plus residual.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub bn1:        BatchNorm<B, 2>,
    pub conv2:      Conv2d<B>,
    pub bn2:        BatchNorm<B, 2>,
    pub conv3:      Conv2d<B>,
    pub bn3:        BatchNorm<B, 2>,
    pub relu:       Relu,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    fn new(in_channels: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = width * EXPANSION;

        let conv1 = Conv2dConfig::new([in_channels, width], [1, 1])
            .with_bias(false)
            .init(device);
        let conv2 = Conv2dConfig::new([width, width], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let conv3 = Conv2dConfig::new([width, out_channels], [1, 1])
            .with_bias(false)
            .init(device);

        let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
        });

        Self {
            conv1, bn1: BatchNormConfig::new(width).init(device),
            conv2, bn2: BatchNormConfig::new(width).init(device),
            conv3, bn3: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            downsample,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(down) => down.forward(x.clone()),
            None       => x.clone(),
        };

        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.relu.forward(self.bn2.forward(self.conv2.forward(out)));
        let out = self.bn3.forward(self.conv3.forward(out));
        self.relu.forward(out + identity)
    }
}

/// Field names follow torchvision so its state dict maps onto this
/// module with only the `downsample.{0,1}` keys renamed.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub bn1:     BatchNorm<B, 2>,
    pub relu:    Relu,
    pub maxpool: MaxPool2d,
    pub layer1:  Vec<Bottleneck<B>>,
    pub layer2:  Vec<Bottleneck<B>>,
    pub layer3:  Vec<Bottleneck<B>>,
    pub layer4:  Vec<Bottleneck<B>>,
    pub avgpool: AdaptiveAvgPool2d,
    pub fc:      Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(images)));
        let mut x = self.maxpool.forward(x);

        for stage in [&self.layer1, &self.layer2, &self.layer3, &self.layer4] {
            for block in stage {
                x = block.forward(x);
            }
        }

        let x = self.avgpool.forward(x); // [batch, C, 1, 1]
        self.fc.forward(x.flatten::<2>(1, 3))
    }

    pub fn num_classes(&self) -> usize {
        self.fc.weight.val().dims()[1]
    }

    /// Swap the classification layer for a freshly initialised one
    /// with `num_classes` outputs. The backbone is untouched.
    pub fn with_head(mut self, num_classes: usize, device: &B::Device) -> Self {
        let in_features = self.fc.weight.val().dims()[0];
        self.fc = LinearConfig::new(in_features, num_classes).init(device);
        self
    }
}
