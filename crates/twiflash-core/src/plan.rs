//! Transfer plan derivation.
//!
//! Scans the image in page-size strides and keeps only pages that carry
//! firmware content, i.e. at least one non-blank byte. Pages are emitted in
//! ascending scan order and never merged or reordered; the bootloader
//! expects monotonically non-decreasing page addresses.

use thiserror::Error;

use crate::image::MemoryImage;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    #[error("image size {size} is not a multiple of the page size {page_size}")]
    MisalignedImageSize { size: usize, page_size: usize },
}

/// One page of the transfer plan: a page-aligned device offset plus exactly
/// one page worth of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    offset: u16,
    bytes: Vec<u8>,
}

impl Page {
    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Ordered set of pages to transfer, derived once from an image and
/// consumed read-only by the updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pages: Vec<Page>,
    page_size: usize,
}

impl TransferPlan {
    /// Compact `image` into the minimal set of pages to transfer.
    pub fn compact(image: &MemoryImage, page_size: usize) -> Result<Self, PlanError> {
        if page_size == 0 || image.len() % page_size != 0 {
            return Err(PlanError::MisalignedImageSize {
                size: image.len(),
                page_size,
            });
        }

        let blank = image.blank();
        let mut pages = Vec::new();
        for (index, window) in image.as_bytes().chunks_exact(page_size).enumerate() {
            if window.iter().all(|&b| b == blank) {
                continue;
            }
            pages.push(Page {
                offset: (index * page_size) as u16,
                bytes: window.to_vec(),
            });
        }

        Ok(Self { pages, page_size })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Device offset of the first transferred page.
    pub fn first_offset(&self) -> Option<u16> {
        self.pages.first().map(Page::offset)
    }

    /// Total number of bytes the device will receive.
    pub fn data_len(&self) -> usize {
        self.pages.len() * self.page_size
    }

    /// All page bytes concatenated in transfer order.
    pub fn flattened(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.data_len());
        for page in &self.pages {
            data.extend_from_slice(&page.bytes);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(writes: &[(usize, &[u8])]) -> MemoryImage {
        let mut image = MemoryImage::new(8192, 0xFF);
        for &(offset, data) in writes {
            image.write(offset, data).unwrap();
        }
        image
    }

    #[test]
    fn test_all_blank_yields_empty_plan() {
        let image = MemoryImage::new(8192, 0xFF);
        let plan = TransferPlan::compact(&image, 64).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.data_len(), 0);
    }

    #[test]
    fn test_two_sparse_regions() {
        let image = image_with(&[
            (0, &[0x01, 0x02, 0x03, 0x04]),
            (4096, &[0xAA, 0xBB, 0xCC, 0xDD]),
        ]);
        let plan = TransferPlan::compact(&image, 64).unwrap();

        assert_eq!(plan.page_count(), 2);
        let first = &plan.pages()[0];
        let second = &plan.pages()[1];
        assert_eq!(first.offset(), 0);
        assert_eq!(second.offset(), 4096);
        assert_eq!(first.bytes().len(), 64);
        assert_eq!(second.bytes().len(), 64);
        assert_eq!(&first.bytes()[..4], &[0x01, 0x02, 0x03, 0x04]);
        assert!(first.bytes()[4..].iter().all(|&b| b == 0xFF));
        assert_eq!(&second.bytes()[..4], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert!(second.bytes()[4..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_offsets_ascend_and_stay_in_bounds() {
        let image = image_with(&[(100, &[1]), (1000, &[2]), (8191, &[3])]);
        let plan = TransferPlan::compact(&image, 64).unwrap();

        let offsets: Vec<u16> = plan.pages().iter().map(Page::offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(offsets, sorted);
        for page in plan.pages() {
            assert_eq!(page.offset() as usize % 64, 0);
            assert!(page.offset() as usize + page.bytes().len() <= 8192);
        }
    }

    #[test]
    fn test_compact_is_idempotent() {
        let image = image_with(&[(0, &[9, 8, 7]), (600, &[1, 2, 3])]);
        let a = TransferPlan::compact(&image, 64).unwrap();
        let b = TransferPlan::compact(&image, 64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let payload: Vec<u8> = (0u8..200).collect();
        let image = image_with(&[(320, &payload)]);
        let plan = TransferPlan::compact(&image, 64).unwrap();

        let mut rebuilt = MemoryImage::new(8192, 0xFF);
        for page in plan.pages() {
            rebuilt.write(page.offset() as usize, page.bytes()).unwrap();
        }
        assert_eq!(rebuilt.as_bytes(), image.as_bytes());
    }

    #[test]
    fn test_misaligned_image_size_is_rejected() {
        let image = MemoryImage::new(100, 0xFF);
        let err = TransferPlan::compact(&image, 64).unwrap_err();
        assert_eq!(
            err,
            PlanError::MisalignedImageSize {
                size: 100,
                page_size: 64
            }
        );
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let image = MemoryImage::new(128, 0xFF);
        assert!(TransferPlan::compact(&image, 0).is_err());
    }

    #[test]
    fn test_flattened_matches_page_order() {
        let image = image_with(&[(64, &[0x11]), (192, &[0x22])]);
        let plan = TransferPlan::compact(&image, 64).unwrap();
        let flat = plan.flattened();
        assert_eq!(flat.len(), 128);
        assert_eq!(flat[0], 0x11);
        assert_eq!(flat[64], 0x22);
        assert_eq!(plan.first_offset(), Some(64));
    }
}
