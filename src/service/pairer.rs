use crate::models::{Document, LineItem, PairingConflict, PairingOutcome, PositionNormalizer};
use indexmap::IndexSet;

/// 图纸配对服务：按位置号把明细和上传的文档对应起来
pub struct DocumentPairer {
    normalizer: PositionNormalizer,
}

impl DocumentPairer {
    pub fn new(normalizer: PositionNormalizer) -> Self {
        Self { normalizer }
    }

    /// 配对 (先到先得)
    ///
    /// 文档匹配键等于归一化位置号或原始位置号即命中；同一明细命中多个文档时取
    /// 第一个，其余记入 `conflicts`。未命中的明细文档字段为 `None`。
    pub fn pair(&self, records: &[LineItem], documents: &[Document]) -> PairingOutcome {
        let mut used: IndexSet<usize> = IndexSet::new();
        let mut conflicts = Vec::new();

        let paired: Vec<LineItem> = records
            .iter()
            .map(|record| {
                let normalized = self.normalizer.normalize(&record.position_number);
                let hits: Vec<usize> = documents
                    .iter()
                    .enumerate()
                    .filter(|(_, doc)| {
                        let key = doc.match_key();
                        key == normalized || key == record.position_number
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if hits.len() > 1 {
                    tracing::warn!(
                        "Position {} matches {} documents, using {}",
                        record.position_number,
                        hits.len(),
                        documents[hits[0]].file_name
                    );
                    conflicts.push(PairingConflict {
                        position_number: record.position_number.clone(),
                        candidates: hits.iter().map(|&i| documents[i].file_name.clone()).collect(),
                    });
                }

                let chosen = hits.first().map(|&i| &documents[i]);
                if let Some(&i) = hits.first() {
                    used.insert(i);
                }
                LineItem {
                    document_name: chosen.map(|d| d.file_name.clone()),
                    document_url: chosen.map(|d| d.url.clone()),
                    ..record.clone()
                }
            })
            .collect();

        let unused: Vec<String> = documents
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used.contains(idx))
            .map(|(_, d)| d.file_name.clone())
            .collect();

        let outcome = PairingOutcome {
            records: paired,
            conflicts,
            unused,
        };

        tracing::info!(
            "Paired {}/{} records with {} documents ({} conflicts, {} unused)",
            outcome.matched_count(),
            records.len(),
            documents.len(),
            outcome.conflicts.len(),
            outcome.unused.len()
        );

        outcome
    }
}

impl Default for DocumentPairer {
    fn default() -> Self {
        Self::new(PositionNormalizer::default())
    }
}
