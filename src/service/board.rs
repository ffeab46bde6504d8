use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::models::{
    parse_amount, LineItem, PositionNormalizer, ProgressTotals, Project, ProjectId,
    ProjectSummary, QuantityField, RecordPatch,
};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// 取第 `page_index` 页 (从 0 开始)，越界时返回剩余部分或空切片
pub fn page_slice<T>(items: &[T], page_index: usize, page_size: usize) -> &[T] {
    let start = page_index.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// 翻页状态 (页码从 1 开始)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn next(&mut self) {
        self.page += 1;
    }

    /// 第 1 页时不动
    pub fn previous(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page_slice(items, self.page - 1, self.page_size)
    }
}

/// 项目及其缓存的汇总
#[derive(Debug, Clone)]
struct TrackedProject {
    project: Project,
    totals: ProgressTotals,
}

impl TrackedProject {
    fn new(project: Project) -> Self {
        let totals = project.totals();
        Self { project, totals }
    }

    fn recompute(&mut self) {
        self.totals = self.project.totals();
    }
}

/// 生产进度看板
///
/// 持有全部项目的内存副本、当前选中的项目和翻页状态。每次明细变更都从完整
/// 明细重算汇总，不做增量累加。
#[derive(Debug)]
pub struct ProjectBoard {
    projects: IndexMap<ProjectId, TrackedProject>,
    selected: Option<ProjectId>,
    pager: Pager,
    normalizer: PositionNormalizer,
    projects_path: String,
}

impl ProjectBoard {
    pub fn new(
        config: &BoardConfig,
        normalizer: PositionNormalizer,
        projects_path: impl Into<String>,
    ) -> Self {
        Self {
            projects: IndexMap::new(),
            selected: None,
            pager: Pager::new(config.page_size),
            normalizer,
            projects_path: projects_path.into(),
        }
    }

    /// 用存储推送的完整快照整体替换本地项目表，并在同一步里重算所有汇总
    pub fn apply_snapshot(&mut self, projects: IndexMap<ProjectId, Project>) {
        self.projects = projects
            .into_iter()
            .map(|(id, project)| (id, TrackedProject::new(project)))
            .collect();

        if let Some(id) = &self.selected {
            if !self.projects.contains_key(id) {
                tracing::info!("Selected project {} no longer exists, clearing selection", id);
                self.selected = None;
                self.pager.reset();
            }
        }

        tracing::debug!("Applied snapshot with {} projects", self.projects.len());
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id).map(|t| &t.project)
    }

    pub fn totals(&self, id: &ProjectId) -> Option<ProgressTotals> {
        self.projects.get(id).map(|t| t.totals)
    }

    pub fn summaries(&self) -> Vec<ProjectSummary> {
        self.projects
            .iter()
            .map(|(id, t)| ProjectSummary {
                id: id.clone(),
                name: t.project.name.clone(),
                record_count: t.project.records.len(),
                totals: t.totals,
                percent: t.totals.percent(),
            })
            .collect()
    }

    /// 选择项目，空字符串表示取消选择；翻页回到第 1 页
    pub fn select_project(&mut self, id: &str) -> Result<(), BoardError> {
        self.pager.reset();
        if id.trim().is_empty() {
            self.selected = None;
            return Ok(());
        }
        let id = ProjectId::new(id);
        if !self.projects.contains_key(&id) {
            return Err(BoardError::ProjectNotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn selected(&self) -> Option<&ProjectId> {
        self.selected.as_ref()
    }

    pub fn selected_totals(&self) -> ProgressTotals {
        self.selected
            .as_ref()
            .and_then(|id| self.totals(id))
            .unwrap_or_default()
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn next_page(&mut self) {
        if self.selected.is_some() {
            self.pager.next();
        }
    }

    pub fn previous_page(&mut self) {
        self.pager.previous();
    }

    /// 当前页的明细，没有选中项目时为空
    pub fn current_page(&self) -> &[LineItem] {
        match self.selected.as_ref().and_then(|id| self.projects.get(id)) {
            Some(t) => self.pager.slice(&t.project.records),
            None => &[],
        }
    }

    /// 操作员直接改写选中项目某条明细的已完成 / 已发货数量
    pub fn set_quantity(
        &mut self,
        index: usize,
        field: QuantityField,
        text: &str,
    ) -> Result<RecordPatch, BoardError> {
        let id = self.selected.clone().ok_or(BoardError::NoProjectSelected)?;
        self.set_quantity_in(&id, index, field, text)
    }

    /// 改写指定项目某条明细的数量
    ///
    /// 空输入视为 0，非数字拒绝。`index` 是项目明细里的绝对下标。
    pub fn set_quantity_in(
        &mut self,
        id: &ProjectId,
        index: usize,
        field: QuantityField,
        text: &str,
    ) -> Result<RecordPatch, BoardError> {
        let value = if text.trim().is_empty() {
            0
        } else {
            parse_amount(text).ok_or_else(|| BoardError::InvalidAmount(text.to_string()))?
        };

        let tracked = self.tracked_mut(id)?;
        let len = tracked.project.records.len();
        let record = tracked
            .project
            .records
            .get_mut(index)
            .ok_or(BoardError::RecordIndexOutOfRange { index, len })?;

        let mut fields = Map::new();
        match field {
            QuantityField::Completed => {
                if record.quantity_completed != value {
                    record.quantity_completed = value;
                    let now = Utc::now();
                    record.last_updated_at = Some(now);
                    fields.insert("Date".to_string(), Value::String(now.to_rfc3339()));
                }
            }
            QuantityField::Shipped => record.quantity_shipped = value,
        }
        fields.insert(field.key().to_string(), Value::from(value));
        tracked.recompute();

        Ok(RecordPatch {
            path: record_path(&self.projects_path, id, index),
            fields,
        })
    }

    /// 报工：给选中项目里指定位置号的明细累加已完成数量
    pub fn add_production(&mut self, position: &str, amount: &str) -> Result<RecordPatch, BoardError> {
        let id = self.selected.clone().ok_or(BoardError::NoProjectSelected)?;
        self.add_production_in(&id, position, amount)
    }

    /// 报工到指定项目
    ///
    /// 位置号为空或找不到、数量不是非负整数时拒绝，不做任何修改。
    pub fn add_production_in(
        &mut self,
        id: &ProjectId,
        position: &str,
        amount: &str,
    ) -> Result<RecordPatch, BoardError> {
        if position.trim().is_empty() {
            return Err(BoardError::PositionNotFound(position.to_string()));
        }
        let amount = parse_amount(amount).ok_or_else(|| BoardError::InvalidAmount(amount.to_string()))?;

        let normalizer = self.normalizer.clone();
        let tracked = self.tracked_mut(id)?;
        let index = tracked
            .project
            .find_position(position.trim(), &normalizer)
            .ok_or_else(|| BoardError::PositionNotFound(position.to_string()))?;

        let record = &mut tracked.project.records[index];
        record.quantity_completed = record.quantity_completed.saturating_add(amount);
        let now = Utc::now();
        record.last_updated_at = Some(now);

        let mut fields = Map::new();
        fields.insert(
            QuantityField::Completed.key().to_string(),
            Value::from(record.quantity_completed),
        );
        fields.insert("Date".to_string(), Value::String(now.to_rfc3339()));

        tracing::info!(
            "Added {} to position {} in project {} (now {}/{})",
            amount,
            record.position_number,
            id,
            record.quantity_completed,
            record.quantity_ordered
        );
        tracked.recompute();

        Ok(RecordPatch {
            path: record_path(&self.projects_path, id, index),
            fields,
        })
    }

    fn tracked_mut(&mut self, id: &ProjectId) -> Result<&mut TrackedProject, BoardError> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| BoardError::ProjectNotFound(id.clone()))
    }
}

fn record_path(projects_path: &str, id: &ProjectId, index: usize) -> String {
    format!("{}/{}/records/{}", projects_path.trim_end_matches('/'), id, index)
}
