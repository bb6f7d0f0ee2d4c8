use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use tempfile::tempdir;

use crate::engine::core::block::block_manager::HEADER_AREA;
use crate::engine::core::block::{BlockManager, BlockPointer};
use crate::shared::storage_header::BinaryHeader;

#[test]
fn write_and_read_across_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint-00000001.db");
    let manager = BlockManager::create(&path, 64).unwrap();

    let small = manager.write(b"hello").unwrap();
    let big_payload: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
    let big = manager.write(&big_payload).unwrap();
    let empty = manager.write(&[]).unwrap();

    assert_eq!(small, BlockPointer { block_id: 0, block_count: 1, length: 5 });
    assert_eq!(big.block_id, 1);
    assert_eq!(big.block_count, 9); // 56 payload bytes per block
    assert_eq!(empty.block_count, 1);

    assert_eq!(manager.read(small).unwrap(), b"hello");
    assert_eq!(manager.read(big).unwrap(), big_payload);
    assert!(manager.read(empty).unwrap().is_empty());
    manager.sync().unwrap();

    let reopened = BlockManager::open(&path).unwrap();
    assert_eq!(reopened.block_size(), 64);
    assert_eq!(reopened.block_count(), 11);
    assert_eq!(reopened.read(big).unwrap(), big_payload);
}

#[test]
fn flipped_payload_byte_is_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.db");
    let ptr = {
        let manager = BlockManager::create(&path, 128).unwrap();
        manager.write(b"some checkpoint bytes").unwrap()
    };
    {
        let mut f = OpenOptions::new().write(true).open(&path).unwrap();
        f.seek(SeekFrom::Start(HEADER_AREA + 10)).unwrap();
        f.write_all(&[0xAB]).unwrap();
    }
    let manager = BlockManager::open(&path).unwrap();
    let err = manager.read(ptr).unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

#[test]
fn pointer_beyond_file_is_corruption() {
    let dir = tempdir().unwrap();
    let manager = BlockManager::create(&dir.path().join("c.db"), 64).unwrap();
    manager.write(b"x").unwrap();
    let err = manager
        .read(BlockPointer { block_id: 3, block_count: 1, length: 1 })
        .unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn partial_trailing_block_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.db");
    {
        let manager = BlockManager::create(&path, 64).unwrap();
        manager.write(b"abc").unwrap();
    }
    let f = OpenOptions::new().write(true).open(&path).unwrap();
    f.set_len(HEADER_AREA + 40).unwrap();
    assert!(BlockManager::open(&path).unwrap_err().is_corruption());
}

#[test]
fn damaged_header_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.db");
    BlockManager::create(&path, 64).unwrap();
    {
        let mut f = OpenOptions::new().write(true).open(&path).unwrap();
        f.seek(SeekFrom::Start(BinaryHeader::TOTAL_LEN as u64 - 1)).unwrap();
        f.write_all(&[0xFF]).unwrap();
    }
    assert!(BlockManager::open(&path).unwrap_err().is_corruption());
}

#[test]
fn rejects_tiny_block_size() {
    let dir = tempdir().unwrap();
    assert!(BlockManager::create(&dir.path().join("c.db"), 16).is_err());
}
