// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the vision system. It is a
// "dumb" data container for a single RGB sample plus the one conversion every
// later stage relies on: hue/saturation/value. Nothing here reads a neighbor;
// anything spatial (masks, morphology, contours) belongs in higher modules.
//
// HSV is reported on the compact 8-bit scale used by the color palette:
//   • hue        0..=179  (degrees / 2, so the wheel fits in a byte)
//   • saturation 0..=255  (chroma / value)
//   • value      0..=255  (max channel)
// Red sits at both ends of the hue axis, which is why the palette allows a
// color to own several disjoint ranges.

pub mod pixel {
    pub type Channel = u8;
    pub type NormalizedChannel = f32;
    pub type Hue = f32;
    pub type Chroma = f32;

    /// Hue values run from 0 up to (but excluding) this bound on the 8-bit scale.
    pub const HUE_SCALE: u16 = 180;

    /// A single RGB sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    /// A pixel expressed in the 8-bit hue/saturation/value space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HsvPixel {
        pub hue: u8,
        pub saturation: u8,
        pub value: u8,
    }

    impl From<image::Rgb<u8>> for Pixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            Pixel::new(rgb.0[0], rgb.0[1], rgb.0[2])
        }
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            )
        }

        /// Chroma (C): color purity = max(R,G,B) - min(R,G,B), normalized.
        pub fn chroma(&self) -> Chroma {
            let (r, g, b) = self.normalized();
            r.max(g.max(b)) - r.min(g.min(b))
        }

        /// Hue angle in degrees [0, 360).
        ///
        /// - Uses normalized sRGB channels, no linearization.
        /// - Achromatic pixels (chroma ~ 0) report a hue of 0.
        pub fn hue_degrees(&self) -> Hue {
            let (r, g, b) = self.normalized();
            let maximum_channel = r.max(g.max(b));
            let chroma = self.chroma();

            if chroma <= 1e-6 {
                return 0.0;
            }

            let inverse_chroma = 1.0 / chroma;
            let (base_difference, sector_offset) = if maximum_channel == r {
                (g - b, 0.0)
            } else if maximum_channel == g {
                (b - r, 2.0)
            } else {
                (r - g, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// Converts the sample into the 8-bit HSV space used by the palette.
        pub fn to_hsv(&self) -> HsvPixel {
            let maximum_channel = self.red.max(self.green.max(self.blue));
            let minimum_channel = self.red.min(self.green.min(self.blue));

            let saturation = if maximum_channel == 0 {
                0
            } else {
                let spread = (maximum_channel - minimum_channel) as u32;
                ((spread * 255 + maximum_channel as u32 / 2) / maximum_channel as u32) as u8
            };

            // 359.x degrees rounds up to 180, which is the same angle as 0.
            let hue = (self.hue_degrees() / 2.0).round() as u16 % HUE_SCALE;

            HsvPixel {
                hue: hue as u8,
                saturation,
                value: maximum_channel,
            }
        }
    }
}
